//! Core abstractions shared by every stage of the migration.
//!
//! - [`record`]: Source record and freshness conversion
//! - [`value`]: SQL value representation for target binding
//! - [`traits`]: Seams between reader, translator, store and orchestrator

pub mod record;
pub mod traits;
pub mod value;

pub use record::{millis_to_utc, SourceRecord, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
pub use traits::{Page, PageSource, RecordKind, TargetRecord, TargetStore};
pub use value::{SqlNullType, SqlValue};
