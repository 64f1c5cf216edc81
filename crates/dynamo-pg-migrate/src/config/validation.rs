//! Configuration validation.

use std::collections::HashSet;

use super::{Config, RecordKindName};
use crate::error::{MigrateError, Result};
use crate::target::SslMode;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if matches!(&config.source.region, Some(r) if r.trim().is_empty()) {
        return Err(MigrateError::Config("source.region must not be empty".into()));
    }
    if let Some(size) = config.source.page_size {
        if size < 1 {
            return Err(MigrateError::Config(
                "source.page_size must be at least 1".into(),
            ));
        }
    }
    if config.source.async_operations_table.is_empty() {
        return Err(MigrateError::Config(
            "source.async_operations_table is required".into(),
        ));
    }
    if config.source.providers_table.is_empty() {
        return Err(MigrateError::Config("source.providers_table is required".into()));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    if config.target.max_connections == 0 {
        return Err(MigrateError::Config(
            "target.max_connections must be at least 1".into(),
        ));
    }
    SslMode::parse(&config.target.ssl_mode)?;

    // Migration validation
    let kinds = &config.migration.record_kinds;
    if kinds.is_empty() {
        return Err(MigrateError::Config(
            "migration.record_kinds must name at least one kind".into(),
        ));
    }
    let mut seen = HashSet::new();
    for kind in kinds {
        if !seen.insert(kind) {
            return Err(MigrateError::Config(format!(
                "migration.record_kinds lists '{}' more than once",
                kind
            )));
        }
    }
    if kinds.contains(&RecordKindName::Providers)
        && config
            .migration
            .provider_kms_key_id
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
    {
        return Err(MigrateError::Config(
            "migration.provider_kms_key_id is required when migrating providers".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationConfig, SourceConfig, TargetConfig};

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                region: Some("us-east-1".to_string()),
                endpoint: None,
                page_size: Some(100),
                async_operations_table: "AsyncOperationsTable".to_string(),
                providers_table: "ProvidersTable".to_string(),
            },
            target: TargetConfig {
                host: "localhost".to_string(),
                port: 5432,
                database: "target_db".to_string(),
                user: "postgres".to_string(),
                password: "password".to_string(),
                schema: "public".to_string(),
                ssl_mode: "disable".to_string(),
                max_connections: 4,
            },
            migration: MigrationConfig {
                provider_kms_key_id: Some("alias/providers".to_string()),
                ..MigrationConfig::default()
            },
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_target_host() {
        let mut config = valid_config();
        config.target.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_page_size() {
        let mut config = valid_config();
        config.source.page_size = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.target.ssl_mode = "sometimes".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_providers_need_kms_key() {
        let mut config = valid_config();
        config.migration.provider_kms_key_id = None;
        assert!(validate(&config).is_err());

        config.migration.record_kinds = vec![RecordKindName::AsyncOperations];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_record_kind() {
        let mut config = valid_config();
        config.migration.record_kinds =
            vec![RecordKindName::Providers, RecordKindName::Providers];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_record_kinds() {
        let mut config = valid_config();
        config.migration.record_kinds.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_config_debug_redacts_password() {
        let mut config = valid_config();
        config.target.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", config.target);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_456"),
            "Debug output should not contain actual password value"
        );
    }
}
