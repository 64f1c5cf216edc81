//! # dynamo-pg-migrate
//!
//! Idempotent record migration from DynamoDB to PostgreSQL.
//!
//! Each configured record kind is drained from its DynamoDB table one page at
//! a time, validated against a static schema, compared with the row already in
//! PostgreSQL, translated and upserted. Every record ends up migrated, skipped
//! (the target already holds that version or a newer one) or failed, and a
//! failure never stops the rest of the table.
//!
//! - **Paged reads** with `Scan` and `ExclusiveStartKey`, one page in memory
//! - **Re-entrant runs**: re-running over an unchanged source writes nothing
//! - **Atomic upserts** with `INSERT ... ON CONFLICT DO UPDATE`
//! - **Credential encryption** for providers through AWS KMS
//!
//! ## Example
//!
//! ```rust,no_run
//! use dynamo_pg_migrate::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> dynamo_pg_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run(&CancellationToken::new()).await?;
//!     println!("Migrated {}", result.totals);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod source;
pub mod target;
pub mod translate;
pub mod validate;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, RecordKindName, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result, ValidationError};
pub use guard::{should_migrate, GuardDecision};
pub use orchestrator::{
    HealthCheckResult, MigrationResult, MigrationSummary, Orchestrator, RunStatus, TableMigration,
    TableResult, TableStatus,
};
pub use source::{DynamoScanSource, PagedReader};
pub use target::PgStore;
pub use translate::{AsyncOperationKind, Encryptor, KmsEncryptor, ProviderKind};
