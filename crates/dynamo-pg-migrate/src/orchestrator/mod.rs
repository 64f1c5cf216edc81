//! Migration orchestrator - main workflow coordinator.

mod table;

pub use table::{MigrationSummary, RecordOutcome, TableMigration};

use std::time::Instant;

use aws_config::{BehaviorVersion, Region};
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, RecordKindName};
use crate::error::{MigrateError, Result};
use crate::source::{dynamo_client, DynamoScanSource, PagedReader};
use crate::target::{self, PgStore};
use crate::translate::{AsyncOperationKind, KmsEncryptor, PgAsyncOperation, PgProvider, ProviderKind};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    dynamo: aws_sdk_dynamodb::Client,
    pool: Pool,
    encryptor: Option<KmsEncryptor>,
}

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Final state of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    /// Every record migrated or skipped.
    Completed,
    /// The table was drained but some records failed.
    Failed,
    /// A source fetch error stopped the table early.
    Aborted,
    Cancelled,
}

/// Outcome of one record kind's table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResult {
    /// Record kind name.
    pub name: String,

    /// Source table that was scanned.
    pub source_table: String,

    pub status: TableStatus,

    pub summary: MigrationSummary,

    /// Error that aborted the table, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableResult {
    /// Classify the result of [`TableMigration::run`].
    pub fn from_run(
        kind: RecordKindName,
        source_table: &str,
        outcome: Result<MigrationSummary>,
        cancelled: bool,
    ) -> Self {
        let (status, summary, error) = match outcome {
            Ok(summary) if cancelled => (TableStatus::Cancelled, summary, None),
            Ok(summary) if summary.failed > 0 => (TableStatus::Failed, summary, None),
            Ok(summary) => (TableStatus::Completed, summary, None),
            Err(MigrateError::RunAborted { summary, source, .. }) => {
                (TableStatus::Aborted, summary, Some(source.to_string()))
            }
            Err(e) => (TableStatus::Aborted, MigrationSummary::default(), Some(e.to_string())),
        };
        Self {
            name: kind.to_string(),
            source_table: source_table.to_string(),
            status,
            summary,
            error,
        }
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Per-table results, in run order.
    pub tables: Vec<TableResult>,

    /// Counters summed over all tables.
    pub totals: MigrationSummary,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// True when every table was drained with no failed record.
    ///
    /// A cancelled run is not a success even if nothing failed.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Reachability of one source table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTableHealth {
    pub table: String,
    pub reachable: bool,
    pub latency_ms: u64,
    /// Approximate item count reported by DescribeTable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`Orchestrator::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub source_tables: Vec<SourceTableHealth>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_error: Option<String>,
}

impl HealthCheckResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Orchestrator {
    /// Create a new orchestrator. No connection is opened until the first query.
    pub async fn new(config: Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.source.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let dynamo = dynamo_client(&sdk_config, config.source.endpoint.as_deref());
        let pool = target::build_pool(&config.target)?;

        let encryptor = match &config.migration.provider_kms_key_id {
            Some(key_id) if config.migration.record_kinds.contains(&RecordKindName::Providers) => {
                let encryptor = KmsEncryptor::from_sdk_config(&sdk_config, key_id.clone())?;
                info!(
                    "Provider credentials will be encrypted with KMS key {}",
                    encryptor.key_id()
                );
                Some(encryptor)
            }
            _ => None,
        };

        Ok(Self {
            config,
            dynamo,
            pool,
            encryptor,
        })
    }

    /// Run the migration for every configured record kind, in order.
    ///
    /// An aborted table does not stop the run; the next kind is still
    /// migrated. Only an unreachable target fails the whole run up front.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        target::ping(&self.pool).await?;
        info!(
            "Connected to PostgreSQL target: {}:{}/{}",
            self.config.target.host, self.config.target.port, self.config.target.database
        );

        let mut tables = Vec::new();
        for &kind in &self.config.migration.record_kinds {
            if cancel.is_cancelled() {
                warn!("Cancelled before migrating {}", kind);
                break;
            }

            let source_table = self.config.source_table(kind);
            let outcome = self.migrate_kind(kind, cancel).await;
            let result = TableResult::from_run(kind, source_table, outcome, cancel.is_cancelled());

            match result.status {
                TableStatus::Aborted => error!(
                    "{} aborted after {}: {}",
                    result.name,
                    result.summary,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                _ => info!("{} {:?}: {}", result.name, result.status, result.summary),
            }
            tables.push(result);
        }

        let completed_at = Utc::now();
        let result = build_result(run_id, started_at, completed_at, tables, cancel.is_cancelled());

        info!(
            "Migration {:?}: {} in {:.1}s",
            result.status, result.totals, result.duration_seconds
        );
        Ok(result)
    }

    async fn migrate_kind(
        &self,
        kind: RecordKindName,
        cancel: &CancellationToken,
    ) -> Result<MigrationSummary> {
        let source = DynamoScanSource::new(self.dynamo.clone(), self.config.source_table(kind))
            .with_page_size(self.config.source.page_size);
        let mut reader = PagedReader::new(source);
        let schema = &self.config.target.schema;

        match kind {
            RecordKindName::AsyncOperations => {
                let store = PgStore::<PgAsyncOperation>::new(self.pool.clone(), schema);
                TableMigration::new(AsyncOperationKind, store)
                    .run(&mut reader, cancel)
                    .await
            }
            RecordKindName::Providers => {
                let encryptor = self.encryptor.clone().ok_or_else(|| {
                    MigrateError::Config(
                        "migration.provider_kms_key_id is required when migrating providers".into(),
                    )
                })?;
                let store = PgStore::<PgProvider>::new(self.pool.clone(), schema);
                TableMigration::new(ProviderKind::with_kms(encryptor), store)
                    .run(&mut reader, cancel)
                    .await
            }
        }
    }

    /// Check that every configured source table and the target are reachable.
    pub async fn health_check(&self) -> HealthCheckResult {
        let mut source_tables = Vec::new();
        for &kind in &self.config.migration.record_kinds {
            let table = self.config.source_table(kind);
            let start = Instant::now();
            let described = self.dynamo.describe_table().table_name(table).send().await;
            let latency_ms = start.elapsed().as_millis() as u64;

            source_tables.push(match described {
                Ok(output) => SourceTableHealth {
                    table: table.to_string(),
                    reachable: true,
                    latency_ms,
                    item_count: output.table().and_then(|t| t.item_count()),
                    error: None,
                },
                Err(e) => SourceTableHealth {
                    table: table.to_string(),
                    reachable: false,
                    latency_ms,
                    item_count: None,
                    error: Some(aws_sdk_dynamodb::error::DisplayErrorContext(&e).to_string()),
                },
            });
        }

        let start = Instant::now();
        let ping = target::ping(&self.pool).await;
        let target_latency_ms = start.elapsed().as_millis() as u64;

        let target_connected = ping.is_ok();
        let healthy = target_connected && source_tables.iter().all(|t| t.reachable);
        HealthCheckResult {
            healthy,
            source_tables,
            target_connected,
            target_latency_ms,
            target_error: ping.err().map(|e| e.to_string()),
        }
    }
}

fn build_result(
    run_id: String,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    tables: Vec<TableResult>,
    cancelled: bool,
) -> MigrationResult {
    let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

    let mut totals = MigrationSummary::default();
    for table in &tables {
        totals.merge(&table.summary);
    }

    let failed = totals.failed > 0 || tables.iter().any(|t| t.status == TableStatus::Aborted);
    let status = if failed {
        RunStatus::Failed
    } else if cancelled {
        RunStatus::Cancelled
    } else {
        RunStatus::Completed
    };

    MigrationResult {
        run_id,
        status,
        duration_seconds,
        started_at,
        completed_at,
        tables,
        totals,
    }
}
