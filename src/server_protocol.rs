use serde_json::Value;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    TakeSeat { seat_index: i64 },
    SetHost { as_host: bool },
    LeaveSeat,
    StartGame,
    Pos { x: f64, y: f64 },
}

/// Lenient wire parser: anything that does not decode into a known message
/// yields `None` and is dropped by the caller without feedback.
pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "take-seat" => {
            let seat_index = parse_integer(object.get("seatIndex")?)?;
            Some(ParsedClientMessage::TakeSeat { seat_index })
        }
        "set-host" => {
            let as_host = match object.get("asHost") {
                None => false,
                Some(value) => value.as_bool()?,
            };
            Some(ParsedClientMessage::SetHost { as_host })
        }
        "leave-seat" => Some(ParsedClientMessage::LeaveSeat),
        "start-game" => Some(ParsedClientMessage::StartGame),
        "pos" => {
            let x = object.get("x")?.as_f64()?;
            let y = object.get("y")?.as_f64()?;
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Pos { x, y })
        }
        _ => None,
    }
}

/// Accepts integers and integral floats, rejecting everything else
/// (seat indices like 2.5 are not rounded into a valid request).
fn parse_integer(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite()
            && number.fract() == 0.0
            && number >= i64::MIN as f64
            && number <= i64::MAX as f64
        {
            return Some(number as i64);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_take_seat_message() {
        let parsed = parse_client_message(r#"{"type":"take-seat","seatIndex":2}"#);
        assert_eq!(parsed, Some(ParsedClientMessage::TakeSeat { seat_index: 2 }));
    }

    #[test]
    fn parse_take_seat_accepts_integral_float() {
        let parsed = parse_client_message(r#"{"type":"take-seat","seatIndex":2.0}"#);
        assert_eq!(parsed, Some(ParsedClientMessage::TakeSeat { seat_index: 2 }));
    }

    #[test]
    fn parse_take_seat_rejects_fractional_index() {
        assert_eq!(
            parse_client_message(r#"{"type":"take-seat","seatIndex":2.5}"#),
            None
        );
    }

    #[test]
    fn parse_take_seat_requires_index() {
        assert_eq!(parse_client_message(r#"{"type":"take-seat"}"#), None);
        assert_eq!(
            parse_client_message(r#"{"type":"take-seat","seatIndex":"2"}"#),
            None
        );
    }

    #[test]
    fn parse_set_host_message() {
        assert_eq!(
            parse_client_message(r#"{"type":"set-host","asHost":true}"#),
            Some(ParsedClientMessage::SetHost { as_host: true })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"set-host","asHost":false}"#),
            Some(ParsedClientMessage::SetHost { as_host: false })
        );
    }

    #[test]
    fn parse_set_host_defaults_to_relinquish() {
        assert_eq!(
            parse_client_message(r#"{"type":"set-host"}"#),
            Some(ParsedClientMessage::SetHost { as_host: false })
        );
    }

    #[test]
    fn parse_bare_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"leave-seat"}"#),
            Some(ParsedClientMessage::LeaveSeat)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"start-game"}"#),
            Some(ParsedClientMessage::StartGame)
        );
    }

    #[test]
    fn parse_pos_message() {
        let parsed = parse_client_message(r#"{"type":"pos","x":0.25,"y":0.75}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Pos { x: 0.25, y: 0.75 })
        );
    }

    #[test]
    fn parse_pos_rejects_non_finite_coordinates() {
        assert_eq!(parse_client_message(r#"{"type":"pos","x":1e400,"y":0.5}"#), None);
        assert_eq!(
            parse_client_message(r#"{"type":"pos","x":0.5,"y":"0.5"}"#),
            None
        );
        assert_eq!(parse_client_message(r#"{"type":"pos","x":0.5}"#), None);
    }

    #[test]
    fn parse_rejects_unknown_and_malformed_input() {
        assert_eq!(parse_client_message("not json"), None);
        assert_eq!(parse_client_message(r#"{"type":"fly-to-moon"}"#), None);
        assert_eq!(parse_client_message(r#"[1,2,3]"#), None);
        assert_eq!(parse_client_message(r#"{"seatIndex":2}"#), None);
    }
}
