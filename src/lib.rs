pub mod collision;
pub mod constants;
pub mod rng;
pub mod room;
pub mod server_protocol;
pub mod types;
pub mod world;
