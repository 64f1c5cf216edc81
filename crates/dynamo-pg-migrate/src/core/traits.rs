//! Core traits for source-to-target record migration.
//!
//! This module defines the seams of the migration engine:
//!
//! - [`PageSource`]: Fetches one page of raw records from the source table
//! - [`TargetRecord`]: A relational row with a natural key and freshness marker
//! - [`TargetStore`]: Looks up and upserts target records
//! - [`RecordKind`]: Schema, freshness and translation rules for one record type
//!
//! # Design Patterns
//!
//! - **Strategy**: `RecordKind` bundles the per-table rules so the orchestrator
//!   loop stays identical for every table
//! - **Repository**: `TargetStore` hides the SQL behind `get`/`upsert`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::validate::Schema;

use super::record::{SourceRecord, UPDATED_AT_FIELD};
use super::value::SqlValue;

/// One page of source records plus the continuation cursor.
#[derive(Debug, Clone)]
pub struct Page<C> {
    /// Records in source scan order.
    pub records: Vec<SourceRecord>,
    /// Cursor for the next page, `None` when this was the last page.
    pub next: Option<C>,
}

impl<C> Page<C> {
    /// A page with no continuation.
    pub fn last(records: Vec<SourceRecord>) -> Self {
        Self { records, next: None }
    }
}

/// Paginated scan over a keyed source collection.
///
/// Consumers never call this directly; [`crate::source::PagedReader`] wraps it
/// and hides page boundaries.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Opaque continuation token (DynamoDB `LastEvaluatedKey`).
    type Cursor: Clone + Send + Sync;

    /// Name of the source table, for logs and errors.
    fn table_name(&self) -> &str;

    /// Fetch the page starting at `cursor` (`None` for the first page).
    ///
    /// Errors must be [`crate::MigrateError::SourceFetch`].
    async fn fetch_page(&self, cursor: Option<Self::Cursor>) -> Result<Page<Self::Cursor>>;
}

/// A row in the relational target.
///
/// `COLUMNS` is the complete ordered column list; [`to_row`](Self::to_row)
/// must yield exactly one value per column, using NULL for absent data.
pub trait TargetRecord: Send + Sync + Sized + 'static {
    /// Target table name (unqualified).
    const TABLE: &'static str;

    /// Natural primary key column.
    const KEY_COLUMN: &'static str;

    /// Every column, key included, in binding order.
    const COLUMNS: &'static [&'static str];

    /// Column holding [`updated_at`](Self::updated_at).
    const UPDATED_AT_COLUMN: &'static str = "updated_at";

    /// Natural key value.
    fn key(&self) -> &str;

    /// Freshness marker of the stored row.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Render the record as one value per entry of `COLUMNS`.
    fn to_row(&self) -> Vec<SqlValue<'_>>;

    /// Decode a row selected with `COLUMNS`.
    fn from_row(row: &tokio_postgres::Row) -> Result<Self>;
}

/// Storage operations the migration needs from the target.
#[async_trait]
pub trait TargetStore<R: TargetRecord>: Send + Sync {
    /// Fetch the record with the given key.
    ///
    /// Returns [`crate::MigrateError::RecordNotFound`] when no row exists.
    async fn get(&self, id: &str) -> Result<R>;

    /// Atomically create the record, or fully replace it when the stored
    /// row is older. A stored row at least as fresh is left untouched.
    async fn upsert(&self, record: &R) -> Result<()>;
}

#[async_trait]
impl<R: TargetRecord, T: TargetStore<R> + ?Sized> TargetStore<R> for Arc<T> {
    async fn get(&self, id: &str) -> Result<R> {
        (**self).get(id).await
    }

    async fn upsert(&self, record: &R) -> Result<()> {
        (**self).upsert(record).await
    }
}

/// Per-table migration rules.
#[async_trait]
pub trait RecordKind: Send + Sync {
    /// Target row type produced by [`translate`](Self::translate).
    type Target: TargetRecord;

    /// Short name used in config, logs and reports (e.g. `async-operations`).
    fn name(&self) -> &'static str;

    /// Schema every source record must satisfy.
    fn schema(&self) -> &'static Schema;

    /// Freshness marker of a validated source record.
    fn source_freshness(&self, record: &SourceRecord) -> Result<DateTime<Utc>> {
        record.required_timestamp(UPDATED_AT_FIELD)
    }

    /// Map a validated source record into its target row.
    async fn translate(&self, record: &SourceRecord) -> Result<Self::Target>;
}
