//! Error types for the migration library.

use std::fmt;

use thiserror::Error;

use crate::orchestrator::MigrationSummary;

/// Invalid or unreadable configuration.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// A source table could not be read.
pub const EXIT_SOURCE_ERROR: u8 = 2;
/// The target database was unreachable or rejected a query.
pub const EXIT_TARGET_ERROR: u8 = 3;
/// The run finished but some records failed or a table aborted.
pub const EXIT_MIGRATION_FAILED: u8 = 4;
/// File system error.
pub const EXIT_IO_ERROR: u8 = 7;
/// Interrupted by SIGINT/SIGTERM before the run finished.
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fetching a page from the source table failed
    #[error("Source fetch failed for table {table}: {message}")]
    SourceFetch { table: String, message: String },

    /// A source fetch error aborted a table run after some records were processed
    #[error("Migration of {table} aborted after {summary}")]
    RunAborted {
        table: String,
        summary: MigrationSummary,
        #[source]
        source: Box<MigrateError>,
    },

    /// Source record failed schema validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Source record could not be translated into the target shape
    #[error("Translation failed for record {id}: {message}")]
    Translation { id: String, message: String },

    /// Encrypting a sensitive field failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Target database query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// No target row exists for the identifier
    #[error("Record {id} does not exist in {table}")]
    RecordNotFound { table: String, id: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<deadpool_postgres::PoolError> for MigrateError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        MigrateError::pool(e, "acquiring PostgreSQL connection")
    }
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a SourceFetch error
    pub fn source_fetch(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::SourceFetch {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Translation error
    pub fn translation(id: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Translation {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a RecordNotFound error
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        MigrateError::RecordNotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::SourceFetch { .. } | MigrateError::RunAborted { .. } => {
                EXIT_SOURCE_ERROR
            }
            MigrateError::Target(_) | MigrateError::Pool { .. } => EXIT_TARGET_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            _ => EXIT_MIGRATION_FAILED,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

/// Source record does not match its schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Schema the record was checked against.
    pub schema: &'static str,
    /// Identifier of the record, when it has one.
    pub record_id: Option<String>,
    /// Every violated field.
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Names of the violated fields.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record {} failed {} validation: ",
            self.record_id.as_deref().unwrap_or("<unknown>"),
            self.schema
        )?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} ({})", v.field, v.reason)?;
        }
        Ok(())
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_fields() {
        let err = ValidationError {
            schema: "asyncOperation",
            record_id: Some("a1".to_string()),
            violations: vec![
                FieldViolation {
                    field: "status".to_string(),
                    reason: "required".to_string(),
                },
                FieldViolation {
                    field: "updatedAt".to_string(),
                    reason: "expected integer".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("a1"));
        assert!(msg.contains("status (required)"));
        assert!(msg.contains("updatedAt (expected integer)"));
        assert_eq!(err.fields(), vec!["status", "updatedAt"]);
    }

    #[test]
    fn test_run_aborted_chain() {
        let err = MigrateError::RunAborted {
            table: "AsyncOperationsTable".to_string(),
            summary: MigrationSummary {
                records_seen: 50,
                succeeded: 50,
                failed: 0,
                skipped: 0,
            },
            source: Box::new(MigrateError::source_fetch("AsyncOperationsTable", "throttled")),
        };
        assert_eq!(err.exit_code(), EXIT_SOURCE_ERROR);
        let detailed = err.format_detailed();
        assert!(detailed.contains("aborted after 50 records"));
        assert!(detailed.contains("throttled"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yaml");
        assert_eq!(MigrateError::from(io).exit_code(), EXIT_IO_ERROR);
        assert_eq!(MigrateError::pool("refused", "ctx").exit_code(), EXIT_TARGET_ERROR);
        assert_eq!(
            MigrateError::translation("a1", "bad").exit_code(),
            EXIT_MIGRATION_FAILED
        );
    }
}
