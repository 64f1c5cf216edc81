//! SQL value types for binding target columns.
//!
//! Every target record renders itself as one [`SqlValue`] per column so the
//! upsert model can build a single parameterised statement without knowing
//! the concrete record type.

use std::borrow::Cow;
use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// Type hint for NULL values.
///
/// Kept alongside the NULL so logs and tests can tell which column shape a
/// missing value stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    I32,
    String,
    TextArray,
    Json,
}

/// Column value bound into target statements.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL with type hint.
    Null(SqlNullType),

    /// 32-bit signed integer (int).
    I32(i32),

    /// Text data.
    Text(Cow<'a, str>),

    /// `text[]` column.
    TextArray(Vec<String>),

    /// `json`/`jsonb` document.
    Json(serde_json::Value),

    /// `timestamptz`.
    Timestamp(DateTime<Utc>),
}

impl<'a> SqlValue<'a> {
    /// Create a text value from a borrowed string slice.
    #[must_use]
    pub fn text_borrowed(s: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(s))
    }

    /// Optional text; `None` becomes a typed NULL.
    #[must_use]
    pub fn opt_text(s: Option<&'a str>) -> Self {
        s.map_or(SqlValue::Null(SqlNullType::String), SqlValue::text_borrowed)
    }

    #[must_use]
    pub fn opt_i32(v: Option<i32>) -> Self {
        v.map_or(SqlValue::Null(SqlNullType::I32), SqlValue::I32)
    }

    #[must_use]
    pub fn opt_json(v: Option<&serde_json::Value>) -> Self {
        v.map_or(SqlValue::Null(SqlNullType::Json), |j| SqlValue::Json(j.clone()))
    }

    #[must_use]
    pub fn opt_text_array(v: Option<&[String]>) -> Self {
        v.map_or(SqlValue::Null(SqlNullType::TextArray), |a| {
            SqlValue::TextArray(a.to_vec())
        })
    }
}

impl ToSql for SqlValue<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Null(_) => Ok(IsNull::Yes),
            SqlValue::I32(v) => v.to_sql(ty, out),
            SqlValue::Text(v) => v.as_ref().to_sql(ty, out),
            SqlValue::TextArray(v) => v.to_sql(ty, out),
            SqlValue::Json(v) => v.to_sql(ty, out),
            SqlValue::Timestamp(v) => v.to_sql(ty, out),
        }
    }

    // Type checking is delegated to the inner value's impl in to_sql.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
