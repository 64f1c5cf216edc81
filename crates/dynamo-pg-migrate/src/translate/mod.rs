//! Translation of validated source records into target rows.
//!
//! Each record kind enumerates every target column and where it comes from
//! (copy, rename, conversion or default). Optional source fields that are
//! absent map to explicit NULLs, never to omitted columns.

pub mod async_operation;
pub mod encrypt;
pub mod provider;

pub use async_operation::{translate_async_operation, AsyncOperationKind, PgAsyncOperation};
pub use encrypt::{Encryptor, KmsEncryptor};
pub use provider::{PgProvider, ProviderKind};

use crate::core::SourceRecord;
use crate::error::{MigrateError, Result};

fn required_str(record: &SourceRecord, field: &str) -> Result<String> {
    record.str_field(field).map(str::to_string).ok_or_else(|| {
        MigrateError::translation(record.display_id(), format!("{} is missing", field))
    })
}
