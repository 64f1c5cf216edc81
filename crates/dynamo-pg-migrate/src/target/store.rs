//! Single-record lookup and upsert against PostgreSQL.

use std::marker::PhantomData;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::core::{TargetRecord, TargetStore};
use crate::error::{MigrateError, Result};

/// [`TargetStore`] for one target table, keyed by `R::KEY_COLUMN`.
///
/// Issues exactly two statements: a keyed `SELECT` and an
/// `INSERT ... ON CONFLICT DO UPDATE` that replaces every non-key column
/// only when the stored row is older than the incoming one.
pub struct PgStore<R> {
    pool: Pool,
    select_sql: String,
    upsert_sql: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: TargetRecord> PgStore<R> {
    pub fn new(pool: Pool, schema: &str) -> Self {
        Self {
            pool,
            select_sql: select_sql::<R>(schema),
            upsert_sql: upsert_sql::<R>(schema),
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: TargetRecord> TargetStore<R> for PgStore<R> {
    async fn get(&self, id: &str) -> Result<R> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, format!("reading {}", R::TABLE)))?;
        match client.query_opt(&self.select_sql, &[&id]).await? {
            Some(row) => R::from_row(&row),
            None => Err(MigrateError::not_found(R::TABLE, id)),
        }
    }

    async fn upsert(&self, record: &R) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, format!("writing {}", R::TABLE)))?;

        let row = record.to_row();
        let params: Vec<&(dyn ToSql + Sync)> =
            row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let affected = client.execute(&self.upsert_sql, &params).await?;
        if affected == 0 {
            debug!(
                table = R::TABLE,
                id = record.key(),
                "stored row is as fresh, left unchanged"
            );
        } else {
            debug!(table = R::TABLE, id = record.key(), "upserted");
        }
        Ok(())
    }
}

/// Quote a PostgreSQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Qualify a table name with schema.
fn qualify_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_sql<R: TargetRecord>(schema: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1",
        column_list(R::COLUMNS),
        qualify_table(schema, R::TABLE),
        quote_ident(R::KEY_COLUMN)
    )
}

fn upsert_sql<R: TargetRecord>(schema: &str) -> String {
    let placeholders = (1..=R::COLUMNS.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = R::COLUMNS
        .iter()
        .filter(|c| **c != R::KEY_COLUMN)
        .map(|c| format!("{0} = EXCLUDED.{0}", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");

    // A concurrent writer may have stored a newer row since the guard read it.
    format!(
        "INSERT INTO {} AS existing ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {} \
         WHERE existing.{updated_at} < EXCLUDED.{updated_at}",
        qualify_table(schema, R::TABLE),
        column_list(R::COLUMNS),
        placeholders,
        quote_ident(R::KEY_COLUMN),
        updates,
        updated_at = quote_ident(R::UPDATED_AT_COLUMN)
    )
}
