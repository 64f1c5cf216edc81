//! Source record validation against static schemas.
//!
//! A [`Schema`] lists the fields a record may carry, their JSON type, whether
//! they are required and, for enumerations, the allowed values. Validation
//! collects every violation instead of stopping at the first one so a single
//! log line tells the operator everything wrong with a record.

pub mod schemas;

use serde_json::Value;

use crate::core::SourceRecord;
use crate::error::{FieldViolation, ValidationError};

pub use schemas::{ASYNC_OPERATION, PROVIDER};

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }
}

/// One field of a schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Allowed string values; empty means unrestricted.
    pub allowed: &'static [&'static str],
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            allowed: &[],
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            allowed: &[],
        }
    }

    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }
}

/// Static record schema.
#[derive(Debug)]
pub struct Schema {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Check a raw record against a schema.
///
/// Fields the schema does not mention are ignored. Null counts as absent.
pub fn validate(record: &SourceRecord, schema: &Schema) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    for spec in schema.fields {
        let Some(value) = record.get(spec.name) else {
            if spec.required {
                violations.push(violation(spec.name, "required field is missing".into()));
            }
            continue;
        };

        if !spec.kind.matches(value) {
            violations.push(violation(
                spec.name,
                format!("expected {}", spec.kind.as_str()),
            ));
            continue;
        }

        if !spec.allowed.is_empty() {
            let ok = value.as_str().is_some_and(|s| spec.allowed.contains(&s));
            if !ok {
                violations.push(violation(
                    spec.name,
                    format!("must be one of {}", spec.allowed.join(", ")),
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            schema: schema.title,
            record_id: record.id().map(str::to_string),
            violations,
        })
    }
}

fn violation(field: &str, reason: String) -> FieldViolation {
    FieldViolation {
        field: field.to_string(),
        reason,
    }
}
