//! Per-table migration loop: read, validate, guard, translate, upsert.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{PageSource, RecordKind, SourceRecord, TargetRecord, TargetStore};
use crate::error::{MigrateError, Result};
use crate::guard::{should_migrate, GuardDecision};
use crate::source::PagedReader;
use crate::validate::validate;

/// Counters for one table run.
///
/// `records_seen == succeeded + failed + skipped` holds after every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub records_seen: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl MigrationSummary {
    /// Count one processed record.
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.records_seen += 1;
        match outcome {
            RecordOutcome::Migrated => self.succeeded += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed => self.failed += 1,
        }
    }

    /// Fold another table's counters into this one.
    pub fn merge(&mut self, other: &MigrationSummary) {
        self.records_seen += other.records_seen;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    pub fn is_consistent(&self) -> bool {
        self.records_seen == self.succeeded + self.failed + self.skipped
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records ({} migrated, {} skipped, {} failed)",
            self.records_seen, self.succeeded, self.skipped, self.failed
        )
    }
}

/// Classification of one processed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Migrated,
    Skipped,
    Failed,
}

/// Migrates one source table of a single record kind into its target table.
pub struct TableMigration<K, T> {
    kind: K,
    store: T,
}

impl<K, T> TableMigration<K, T>
where
    K: RecordKind,
    T: TargetStore<K::Target>,
{
    pub fn new(kind: K, store: T) -> Self {
        Self { kind, store }
    }

    /// Process one record. `Ok` is migrated or skipped; `Err` is a per-record failure.
    pub async fn migrate_record(&self, record: &SourceRecord) -> Result<RecordOutcome> {
        validate(record, self.kind.schema())?;
        let freshness = self.kind.source_freshness(record)?;

        let id = record.display_id();
        let existing = match self.store.get(id).await {
            Ok(row) => Some(row),
            Err(MigrateError::RecordNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        if should_migrate(freshness, existing.as_ref()) == GuardDecision::Skip {
            info!(
                kind = self.kind.name(),
                id,
                "Record already migrated, skipping"
            );
            return Ok(RecordOutcome::Skipped);
        }

        let target = self.kind.translate(record).await?;
        self.store.upsert(&target).await?;
        debug!(kind = self.kind.name(), id = target.key(), "Record migrated");
        Ok(RecordOutcome::Migrated)
    }

    /// Drain `reader`, migrating every record.
    ///
    /// Per-record failures are logged and counted. A page fetch failure stops
    /// the run with [`MigrateError::RunAborted`] carrying the counters so far.
    /// Cancellation is honoured between records and returns the partial summary.
    pub async fn run<S: PageSource>(
        &self,
        reader: &mut PagedReader<S>,
        cancel: &CancellationToken,
    ) -> Result<MigrationSummary> {
        let table = reader.table_name().to_string();
        let mut summary = MigrationSummary::default();
        info!(
            "Migrating {} from {} into {}",
            self.kind.name(),
            table,
            <K::Target as TargetRecord>::TABLE
        );

        loop {
            if cancel.is_cancelled() {
                warn!("Migration of {} cancelled after {}", table, summary);
                break;
            }

            let outcome = match reader.peek().await {
                Ok(Some(record)) => match self.migrate_record(record).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(
                            table = %table,
                            id = record.display_id(),
                            error = %e,
                            "Record migration failed"
                        );
                        RecordOutcome::Failed
                    }
                },
                Ok(None) => break,
                Err(e) => return Err(abort(&table, summary, e)),
            };

            if let Err(e) = reader.shift().await {
                return Err(abort(&table, summary, e));
            }
            summary.record(outcome);
            debug_assert!(summary.is_consistent());
        }

        info!("Finished {}: {}", table, summary);
        Ok(summary)
    }
}

fn abort(table: &str, summary: MigrationSummary, source: MigrateError) -> MigrateError {
    warn!("Aborting {} after {}: {}", table, summary, source);
    MigrateError::RunAborted {
        table: table.to_string(),
        summary,
        source: Box::new(source),
    }
}
