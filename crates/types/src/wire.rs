// Path: crates/types/src/wire.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypesError;
use crate::event::Event;
use crate::filter::Filter;

/// A message framed as a JSON array received from a transport, per spec §6.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Event(Box<Event>),
    Req {
        sub_id: String,
        filters: Vec<Filter>,
    },
    Close {
        sub_id: String,
    },
    Count {
        sub_id: String,
        filters: Vec<Filter>,
    },
    Auth(Box<Event>),
}

/// A message framed as a JSON array sent back to a transport, per spec §6.
#[derive(Debug, Clone)]
pub enum RelayMessage {
    Event {
        sub_id: String,
        event: Box<Event>,
    },
    Eose {
        sub_id: String,
    },
    Ok {
        event_id: [u8; 32],
        accepted: bool,
        message: String,
    },
    Notice {
        message: String,
    },
    Closed {
        sub_id: String,
        reason: String,
    },
    Count {
        sub_id: String,
        count: u64,
    },
}

impl ClientMessage {
    /// Parses a single framed JSON message into a typed `ClientMessage`.
    /// Any shape error maps to `TypesError::InvalidFraming`, which the
    /// dispatcher turns into a `NOTICE` per spec §7 without closing the
    /// connection.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let value: Value = serde_json::from_str(raw)?;
        let array = value
            .as_array()
            .ok_or_else(|| TypesError::InvalidFraming("message is not a JSON array".into()))?;
        let tag = array
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| TypesError::InvalidFraming("missing message tag".into()))?;

        match tag {
            "EVENT" => {
                let event_value = array
                    .get(1)
                    .ok_or_else(|| TypesError::InvalidFraming("EVENT missing payload".into()))?;
                let event: Event = serde_json::from_value(event_value.clone())?;
                Ok(ClientMessage::Event(Box::new(event)))
            }
            "REQ" => {
                let sub_id = sub_id_at(array, 1)?;
                let filters = parse_filters(array, 2)?;
                Ok(ClientMessage::Req { sub_id, filters })
            }
            "CLOSE" => Ok(ClientMessage::Close {
                sub_id: sub_id_at(array, 1)?,
            }),
            "COUNT" => {
                let sub_id = sub_id_at(array, 1)?;
                let filters = parse_filters(array, 2)?;
                Ok(ClientMessage::Count { sub_id, filters })
            }
            "AUTH" => {
                let event_value = array
                    .get(1)
                    .ok_or_else(|| TypesError::InvalidFraming("AUTH missing payload".into()))?;
                let event: Event = serde_json::from_value(event_value.clone())?;
                Ok(ClientMessage::Auth(Box::new(event)))
            }
            other => Err(TypesError::InvalidFraming(format!(
                "unknown message tag: {other}"
            ))),
        }
    }
}

fn sub_id_at(array: &[Value], index: usize) -> Result<String, TypesError> {
    array
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TypesError::InvalidFraming("missing subscription id".into()))
}

fn parse_filters(array: &[Value], start: usize) -> Result<Vec<Filter>, TypesError> {
    array[start.min(array.len())..]
        .iter()
        .map(|v| serde_json::from_value::<Filter>(v.clone()).map_err(Into::into))
        .collect()
}

impl RelayMessage {
    /// Serializes into the framed JSON array shape a transport writes back.
    pub fn to_json(&self) -> String {
        let value = match self {
            RelayMessage::Event { sub_id, event } => {
                serde_json::json!(["EVENT", sub_id, event])
            }
            RelayMessage::Eose { sub_id } => serde_json::json!(["EOSE", sub_id]),
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => serde_json::json!(["OK", hex::encode(event_id), accepted, message]),
            RelayMessage::Notice { message } => serde_json::json!(["NOTICE", message]),
            RelayMessage::Closed { sub_id, reason } => {
                serde_json::json!(["CLOSED", sub_id, reason])
            }
            RelayMessage::Count { sub_id, count } => {
                serde_json::json!(["COUNT", sub_id, { "count": count }])
            }
        };
        value.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CountPayload {
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_close_message() {
        let msg = ClientMessage::parse(r#"["CLOSE","sub1"]"#).unwrap();
        match msg {
            ClientMessage::Close { sub_id } => assert_eq!(sub_id, "sub1"),
            _ => panic!("expected Close"),
        }
    }

    #[test]
    fn rejects_non_array_message() {
        let err = ClientMessage::parse(r#"{"not":"an array"}"#).unwrap_err();
        assert!(matches!(err, TypesError::InvalidFraming(_)));
    }

    #[test]
    fn ok_message_serializes_with_hex_id() {
        let msg = RelayMessage::Ok {
            event_id: [0xabu8; 32],
            accepted: true,
            message: String::new(),
        };
        let json = msg.to_json();
        assert!(json.contains(&hex::encode([0xabu8; 32])));
    }
}
