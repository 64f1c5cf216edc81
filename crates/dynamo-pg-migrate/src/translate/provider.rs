//! Provider records: `ProvidersTable` -> `providers`.
//!
//! Credentials (`username`, `password`) are re-encrypted through the injected
//! [`Encryptor`] before they are written; every other field is copied or
//! renamed. Providers written before `updatedAt` existed use `createdAt` as
//! their freshness marker.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::{
    RecordKind, SourceRecord, SqlValue, TargetRecord, CREATED_AT_FIELD, UPDATED_AT_FIELD,
};
use crate::error::{MigrateError, Result};
use crate::validate::{Schema, PROVIDER};

use super::encrypt::{Encryptor, KmsEncryptor};
use super::required_str;

/// Row of the `providers` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PgProvider {
    pub name: String,
    pub protocol: String,
    pub host: String,
    pub port: Option<i32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub global_connection_limit: Option<i32>,
    pub private_key: Option<String>,
    pub cm_key_id: Option<String>,
    pub certificate_uri: Option<String>,
    pub allowed_redirects: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TargetRecord for PgProvider {
    const TABLE: &'static str = "providers";
    const KEY_COLUMN: &'static str = "name";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "protocol",
        "host",
        "port",
        "username",
        "password",
        "global_connection_limit",
        "private_key",
        "cm_key_id",
        "certificate_uri",
        "allowed_redirects",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> &str {
        &self.name
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_row(&self) -> Vec<SqlValue<'_>> {
        vec![
            SqlValue::text_borrowed(&self.name),
            SqlValue::text_borrowed(&self.protocol),
            SqlValue::text_borrowed(&self.host),
            SqlValue::opt_i32(self.port),
            SqlValue::opt_text(self.username.as_deref()),
            SqlValue::opt_text(self.password.as_deref()),
            SqlValue::opt_i32(self.global_connection_limit),
            SqlValue::opt_text(self.private_key.as_deref()),
            SqlValue::opt_text(self.cm_key_id.as_deref()),
            SqlValue::opt_text(self.certificate_uri.as_deref()),
            SqlValue::opt_text_array(self.allowed_redirects.as_deref()),
            SqlValue::Timestamp(self.created_at),
            SqlValue::Timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &tokio_postgres::Row) -> Result<Self> {
        Ok(Self {
            name: row.try_get("name")?,
            protocol: row.try_get("protocol")?,
            host: row.try_get("host")?,
            port: row.try_get("port")?,
            username: row.try_get("username")?,
            password: row.try_get("password")?,
            global_connection_limit: row.try_get("global_connection_limit")?,
            private_key: row.try_get("private_key")?,
            cm_key_id: row.try_get("cm_key_id")?,
            certificate_uri: row.try_get("certificate_uri")?,
            allowed_redirects: row.try_get("allowed_redirects")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Migration rules for providers.
#[derive(Clone)]
pub struct ProviderKind {
    encryptor: Arc<dyn Encryptor>,
}

impl std::fmt::Debug for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderKind").finish_non_exhaustive()
    }
}

impl ProviderKind {
    /// Use a custom credential transform.
    pub fn with_encryptor(encryptor: Arc<dyn Encryptor>) -> Self {
        Self { encryptor }
    }

    /// Production setup: encrypt credentials with AWS KMS.
    pub fn with_kms(encryptor: KmsEncryptor) -> Self {
        Self::with_encryptor(Arc::new(encryptor))
    }

    async fn encrypt_opt(&self, value: Option<&str>) -> Result<Option<String>> {
        match value {
            Some(plain) => Ok(Some(self.encryptor.encrypt(plain).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RecordKind for ProviderKind {
    type Target = PgProvider;

    fn name(&self) -> &'static str {
        "providers"
    }

    fn schema(&self) -> &'static Schema {
        &PROVIDER
    }

    fn source_freshness(&self, record: &SourceRecord) -> Result<DateTime<Utc>> {
        match record.timestamp_field(UPDATED_AT_FIELD)? {
            Some(ts) => Ok(ts),
            None => record.required_timestamp(CREATED_AT_FIELD),
        }
    }

    async fn translate(&self, record: &SourceRecord) -> Result<PgProvider> {
        let created_at = record.required_timestamp(CREATED_AT_FIELD)?;
        let updated_at = self.source_freshness(record)?;

        Ok(PgProvider {
            name: required_str(record, "id")?,
            protocol: required_str(record, "protocol")?,
            host: required_str(record, "host")?,
            port: opt_i32(record, "port")?,
            username: self.encrypt_opt(record.str_field("username")).await?,
            password: self.encrypt_opt(record.str_field("password")).await?,
            global_connection_limit: opt_i32(record, "globalConnectionLimit")?,
            private_key: record.str_field("privateKey").map(str::to_string),
            cm_key_id: record.str_field("cmKeyId").map(str::to_string),
            certificate_uri: record.str_field("certificateUri").map(str::to_string),
            allowed_redirects: opt_string_list(record, "allowedRedirects")?,
            created_at,
            updated_at,
        })
    }
}

fn opt_i32(record: &SourceRecord, field: &str) -> Result<Option<i32>> {
    match record.i64_field(field) {
        None => Ok(None),
        Some(v) => i32::try_from(v).map(Some).map_err(|_| {
            MigrateError::translation(
                record.display_id(),
                format!("{} value {} does not fit in an integer column", field, v),
            )
        }),
    }
}

fn opt_string_list(record: &SourceRecord, field: &str) -> Result<Option<Vec<String>>> {
    let Some(values) = record.get(field).and_then(Value::as_array) else {
        return Ok(None);
    };
    values
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                MigrateError::translation(
                    record.display_id(),
                    format!("{} must contain only strings", field),
                )
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
