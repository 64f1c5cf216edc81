//! Configuration type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source tables (DynamoDB).
    pub source: SourceConfig,

    /// Target database (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl Config {
    /// Source table holding records of the given kind.
    pub fn source_table(&self, kind: RecordKindName) -> &str {
        match kind {
            RecordKindName::AsyncOperations => &self.source.async_operations_table,
            RecordKindName::Providers => &self.source.providers_table,
        }
    }
}

/// Source (DynamoDB) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// AWS region. Falls back to the SDK's default provider chain when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Endpoint override, e.g. `http://localhost:4566` for LocalStack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Items per Scan request. DynamoDB's 1 MB page limit applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,

    /// Table holding async operation records.
    pub async_operations_table: String,

    /// Table holding provider records.
    pub providers_table: String,
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// Pool size (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Record kinds to migrate, in order (default: all).
    #[serde(default = "default_record_kinds")]
    pub record_kinds: Vec<RecordKindName>,

    /// KMS key used to encrypt provider credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_kms_key_id: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            record_kinds: default_record_kinds(),
            provider_kms_key_id: None,
        }
    }
}

/// Record kinds known to the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKindName {
    AsyncOperations,
    Providers,
}

impl RecordKindName {
    pub const ALL: [RecordKindName; 2] = [RecordKindName::AsyncOperations, RecordKindName::Providers];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKindName::AsyncOperations => "async-operations",
            RecordKindName::Providers => "providers",
        }
    }
}

impl fmt::Display for RecordKindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKindName {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "async-operations" => Ok(RecordKindName::AsyncOperations),
            "providers" => Ok(RecordKindName::Providers),
            other => Err(MigrateError::Config(format!(
                "Unknown record kind '{}'. Valid values: async-operations, providers",
                other
            ))),
        }
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_require() -> String {
    "require".to_string()
}

fn default_max_connections() -> usize {
    4
}

fn default_record_kinds() -> Vec<RecordKindName> {
    RecordKindName::ALL.to_vec()
}
