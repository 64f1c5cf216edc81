//! Source record representation and freshness handling.
//!
//! Source rows arrive as DynamoDB items and are unmarshalled into plain JSON
//! maps, the same shape the DynamoDB document client produces. All timestamps
//! are epoch milliseconds in the source and `TIMESTAMPTZ` in the target; both
//! are compared as [`DateTime<Utc>`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MigrateError, Result};

/// Name of the identifier attribute shared by every source table.
pub const ID_FIELD: &str = "id";

/// Name of the last-modified attribute in source records.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Name of the creation attribute in source records.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// One record read from the source table. Immutable once read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord {
    fields: Map<String, Value>,
}

impl SourceRecord {
    /// Wrap an unmarshalled attribute map.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Raw field value. JSON `null` is reported as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Whether the field is present and non-null.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// The record identifier, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.str_field(ID_FIELD)
    }

    /// Identifier for log lines; never fails.
    pub fn display_id(&self) -> &str {
        self.id().unwrap_or("<missing id>")
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn i64_field(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Read an epoch-millisecond field as a UTC timestamp.
    ///
    /// Returns `Ok(None)` when the field is absent, and an error when it is
    /// present but not an in-range integer.
    pub fn timestamp_field(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => {
                let millis = value.as_i64().ok_or_else(|| {
                    MigrateError::translation(
                        self.display_id(),
                        format!("{} is not an integer epoch-millisecond value", field),
                    )
                })?;
                millis_to_utc(millis)
                    .map(Some)
                    .ok_or_else(|| {
                        MigrateError::translation(
                            self.display_id(),
                            format!("{} value {} is out of range", field, millis),
                        )
                    })
            }
        }
    }

    /// Like [`timestamp_field`](Self::timestamp_field) but the field must exist.
    pub fn required_timestamp(&self, field: &str) -> Result<DateTime<Utc>> {
        self.timestamp_field(field)?.ok_or_else(|| {
            MigrateError::translation(self.display_id(), format!("{} is missing", field))
        })
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for SourceRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

/// Convert epoch milliseconds to the canonical freshness representation.
pub fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SourceRecord {
        match value {
            Value::Object(map) => SourceRecord::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_null_fields_are_absent() {
        let r = record(json!({"id": "a1", "taskArn": null}));
        assert_eq!(r.id(), Some("a1"));
        assert!(!r.contains("taskArn"));
        assert!(r.get("taskArn").is_none());
    }

    #[test]
    fn test_timestamp_field_converts_millis() {
        let r = record(json!({"id": "a1", "updatedAt": 1_600_000_000_123i64}));
        let ts = r.required_timestamp(UPDATED_AT_FIELD).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_600_000_000_123);
        assert!(r.timestamp_field(CREATED_AT_FIELD).unwrap().is_none());
    }

    #[test]
    fn test_timestamp_field_rejects_non_integer() {
        let r = record(json!({"id": "a1", "updatedAt": "yesterday"}));
        let err = r.timestamp_field(UPDATED_AT_FIELD).unwrap_err();
        assert!(matches!(err, MigrateError::Translation { .. }));
    }

    #[test]
    fn test_timestamp_field_rejects_out_of_range() {
        let r = record(json!({"id": "a1", "updatedAt": i64::MAX}));
        assert!(r.timestamp_field(UPDATED_AT_FIELD).is_err());
    }

    #[test]
    fn test_display_id_without_id() {
        let r = record(json!({"status": "RUNNING"}));
        assert_eq!(r.display_id(), "<missing id>");
    }
}
