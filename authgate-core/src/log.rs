use crate::wire::null_as_default;
use serde::{Deserialize, Serialize};

/// One operation-log record. Immutable once emitted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Absent on records written before ids were exposed.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, alias = "source_ip", deserialize_with = "null_as_default")]
    pub ip_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: String,
}

/// A message received on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// Keep-alive. Carries the server's cursor when it has one.
    Heartbeat { last_id: Option<i64> },
    Record(LogEntry),
}

impl StreamMessage {
    /// Decode one `data:` payload.
    ///
    /// Objects with `"type": "heartbeat"` are heartbeats; any other object
    /// must have the log-record shape.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(payload)?;
        if value.get("type").and_then(|t| t.as_str()) == Some("heartbeat") {
            let last_id = value.get("last_id").and_then(|v| v.as_i64());
            return Ok(StreamMessage::Heartbeat { last_id });
        }
        if !value.is_object() {
            return Err(serde::de::Error::custom("push message is not a JSON object"));
        }
        let entry: LogEntry = serde_json::from_value(value)?;
        if entry.action.is_empty() && entry.timestamp.is_empty() {
            return Err(serde::de::Error::custom("push message has no log fields"));
        }
        Ok(StreamMessage::Record(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_heartbeat() {
        let msg = StreamMessage::parse(
            r#"{"type":"heartbeat","timestamp":"2024-01-01T00:00:00","last_id":42}"#,
        )
        .unwrap();
        assert_eq!(msg, StreamMessage::Heartbeat { last_id: Some(42) });
    }

    #[test]
    fn parses_record_with_and_without_id() {
        let with_id = StreamMessage::parse(
            r#"{"id":100,"timestamp":"2024-01-01 10:00:00","ip_address":"10.0.0.1","action":"ADD_API","details":"path=/a","created_at":"x"}"#,
        )
        .unwrap();
        match with_id {
            StreamMessage::Record(e) => {
                assert_eq!(e.id, Some(100));
                assert_eq!(e.ip_address, "10.0.0.1");
                assert_eq!(e.action, "ADD_API");
            }
            other => panic!("unexpected {other:?}"),
        }

        let without_id = StreamMessage::parse(
            r#"{"timestamp":"2024-01-01 10:00:00","ip_address":null,"action":"LOGIN","details":null}"#,
        )
        .unwrap();
        assert!(matches!(without_id, StreamMessage::Record(LogEntry { id: None, .. })));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(StreamMessage::parse("not json").is_err());
        assert!(StreamMessage::parse("[1,2,3]").is_err());
        assert!(StreamMessage::parse(r#"{"foo":"bar"}"#).is_err());
    }
}
