mod project;
mod task;

pub use project::ProjectRow;
pub use task::TaskRow;

use chrono::{DateTime, SecondsFormat, Utc};
use testforge_core::Payload;

use crate::error::DbError;

/// Timestamps are stored as fixed-width RFC 3339 text so that lexical order is
/// chronological and no precision is lost.
pub(crate) fn encode_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(
    table: &'static str,
    id: &str,
    value: &str,
) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::corrupt(table, id, format!("bad timestamp {value:?}: {e}")))
}

/// Empty payloads are stored as NULL.
pub(crate) fn encode_payload(field: &'static str, payload: &Payload) -> Result<Option<String>, DbError> {
    if payload.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(payload)
        .map(Some)
        .map_err(|source| DbError::Encode { field, source })
}

pub(crate) fn decode_payload(
    table: &'static str,
    id: &str,
    value: Option<&str>,
) -> Result<Payload, DbError> {
    match value {
        None => Ok(Payload::new()),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| DbError::corrupt(table, id, format!("bad JSON payload: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamp_round_trip_keeps_nanoseconds() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let encoded = encode_timestamp(dt);
        assert_eq!(encoded, "2023-11-14T22:13:20.123456789Z");
        assert_eq!(decode_timestamp("projects", "x", &encoded).unwrap(), dt);
    }

    #[test]
    fn test_bad_timestamp_is_corrupt() {
        let err = decode_timestamp("tasks", "t1", "yesterday").unwrap_err();
        assert!(matches!(err, DbError::Corrupt { table: "tasks", .. }));
    }

    #[test]
    fn test_empty_payload_is_null() {
        assert_eq!(encode_payload("metadata", &Payload::new()).unwrap(), None);
        assert!(decode_payload("projects", "x", None).unwrap().is_empty());
    }

    #[test]
    fn test_payload_round_trip() {
        let mut payload = Payload::new();
        payload.insert("api_spec_file".into(), json!("/specs/api.json"));
        let encoded = encode_payload("metadata", &payload).unwrap();
        let decoded = decode_payload("projects", "x", encoded.as_deref()).unwrap();
        assert_eq!(decoded, payload);
    }
}
