//! Async operation records: `AsyncOperationsTable` -> `async_operations`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::{
    RecordKind, SourceRecord, SqlValue, TargetRecord, CREATED_AT_FIELD, UPDATED_AT_FIELD,
};
use crate::error::Result;
use crate::validate::{Schema, ASYNC_OPERATION};

use super::required_str;

/// Row of the `async_operations` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PgAsyncOperation {
    pub id: String,
    pub description: String,
    pub operation_type: String,
    pub status: String,
    pub output: Option<Value>,
    pub task_arn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TargetRecord for PgAsyncOperation {
    const TABLE: &'static str = "async_operations";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "description",
        "operation_type",
        "status",
        "output",
        "task_arn",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_row(&self) -> Vec<SqlValue<'_>> {
        vec![
            SqlValue::text_borrowed(&self.id),
            SqlValue::text_borrowed(&self.description),
            SqlValue::text_borrowed(&self.operation_type),
            SqlValue::text_borrowed(&self.status),
            SqlValue::opt_json(self.output.as_ref()),
            SqlValue::opt_text(self.task_arn.as_deref()),
            SqlValue::Timestamp(self.created_at),
            SqlValue::Timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &tokio_postgres::Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            description: row.try_get("description")?,
            operation_type: row.try_get("operation_type")?,
            status: row.try_get("status")?,
            output: row.try_get("output")?,
            task_arn: row.try_get("task_arn")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Translate a validated async operation record.
///
/// `output` is stored in DynamoDB as a JSON string; it is parsed so the
/// target column holds a document. Text that is not valid JSON is kept as a
/// JSON string rather than dropped.
pub fn translate_async_operation(record: &SourceRecord) -> Result<PgAsyncOperation> {
    Ok(PgAsyncOperation {
        id: required_str(record, "id")?,
        description: required_str(record, "description")?,
        operation_type: required_str(record, "operationType")?,
        status: required_str(record, "status")?,
        output: record.str_field("output").map(parse_output),
        task_arn: record.str_field("taskArn").map(str::to_string),
        created_at: record.required_timestamp(CREATED_AT_FIELD)?,
        updated_at: record.required_timestamp(UPDATED_AT_FIELD)?,
    })
}

fn parse_output(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Migration rules for async operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncOperationKind;

#[async_trait]
impl RecordKind for AsyncOperationKind {
    type Target = PgAsyncOperation;

    fn name(&self) -> &'static str {
        "async-operations"
    }

    fn schema(&self) -> &'static Schema {
        &ASYNC_OPERATION
    }

    async fn translate(&self, record: &SourceRecord) -> Result<PgAsyncOperation> {
        translate_async_operation(record)
    }
}
