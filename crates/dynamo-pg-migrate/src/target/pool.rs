//! PostgreSQL connection pool for the target database.

use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Config as PgConfig;
use tracing::{info, warn};

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};

use super::tls::{SslMode, TlsBuilder};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Check a pooled connection with `SELECT 1`.
pub async fn ping(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .map_err(|e| MigrateError::pool(e, "testing PostgreSQL target connection"))?;
    client.simple_query("SELECT 1").await?;
    Ok(())
}

/// Build the target pool. Connections are opened lazily on first use.
pub fn build_pool(config: &TargetConfig) -> Result<Pool> {
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host);
    pg_config.port(config.port);
    pg_config.dbname(&config.database);
    pg_config.user(&config.user);
    pg_config.password(&config.password);

    pg_config.keepalives(true);
    pg_config.keepalives_idle(Duration::from_secs(30));
    pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let ssl_mode = SslMode::parse(&config.ssl_mode)?;
    let mgr = match TlsBuilder::new(ssl_mode).build()? {
        Some(tls) => Manager::from_config(pg_config, tls, mgr_config),
        None => {
            warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
            Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
        }
    };

    let pool = Pool::builder(mgr)
        .max_size(config.max_connections)
        .build()
        .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?;

    info!(
        "PostgreSQL target pool: {}:{}/{} (max {} connections, ssl_mode={:?})",
        config.host, config.port, config.database, config.max_connections, ssl_mode
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetConfig {
        TargetConfig {
            host: "localhost".into(),
            port: 5432,
            database: "app".into(),
            user: "migrator".into(),
            password: "pw".into(),
            schema: "public".into(),
            ssl_mode: "disable".into(),
            max_connections: 3,
        }
    }

    #[tokio::test]
    async fn test_build_pool_is_lazy() {
        let pool = build_pool(&target()).unwrap();
        assert_eq!(pool.status().max_size, 3);
        assert_eq!(pool.status().size, 0);
    }

    #[test]
    fn test_build_pool_rejects_bad_ssl_mode() {
        let mut config = target();
        config.ssl_mode = "maybe".into();
        assert!(matches!(build_pool(&config), Err(MigrateError::Config(_))));
    }
}
