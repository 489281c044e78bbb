//! Relational storage backend (spec.md §4.1 "relational backend").
//!
//! Schema and migration style grounded on the teacher's
//! `db/schema.rs::initialize_database` (`CREATE TABLE IF NOT EXISTS` run at
//! startup via `sqlx`); merge semantics grounded on spec.md's
//! `INSERT ... ON CONFLICT` contract.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::model::{Data, MetricKind};
use crate::retry::{retry_default, RetryError};

use super::Error;

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the single `metrics` table migration. The only observable
    /// contract per spec.md §4.1: after this returns `Ok`, the schema is at
    /// the latest version.
    pub async fn bootstrap(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metrics (
                name  TEXT PRIMARY KEY,
                type  TEXT NOT NULL,
                value DOUBLE PRECISION,
                delta BIGINT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_data(row: &sqlx::postgres::PgRow) -> Result<Data, Error> {
        let kind: String = row.try_get("type")?;
        let kind = match kind.as_str() {
            "gauge" => MetricKind::Gauge,
            "counter" => MetricKind::Counter,
            other => {
                return Err(Error::Unavailable(format!(
                    "unrecognized stored metric type {other:?}"
                )))
            }
        };
        Ok(Data {
            kind,
            name: row.try_get("name")?,
            value: row.try_get("value")?,
            delta: row.try_get("delta")?,
        })
    }

    fn kind_str(kind: MetricKind) -> &'static str {
        match kind {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }

    fn is_connection_refused(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Io(e) if e.kind() == std::io::ErrorKind::ConnectionRefused)
    }
}

#[async_trait]
impl super::Storage for PostgresStorage {
    async fn read(&self, name: &str) -> Result<Option<Data>, Error> {
        let row = sqlx::query("SELECT name, type, value, delta FROM metrics WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        // ErrNoRows maps to `None`, not an error (spec.md §4.1).
        row.as_ref().map(Self::row_to_data).transpose()
    }

    async fn read_all(&self) -> Result<Vec<Data>, Error> {
        let rows = sqlx::query("SELECT name, type, value, delta FROM metrics")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_data).collect()
    }

    async fn update(&self, data: Data) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        upsert_one(&mut tx, &data).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Prepares the same upsert once and executes it per row inside a single
    /// transaction, committing or rolling back as a whole (spec.md §4.1).
    async fn update_batch(&self, data: Vec<Data>) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        for item in &data {
            upsert_one(&mut tx, item).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Wraps the driver ping in the retry primitive, gated on
    /// connection-refused (spec.md §4.1).
    async fn ping(&self) -> Result<(), Error> {
        let cancel = tokio_util::sync::CancellationToken::new();
        retry_default(Self::is_connection_refused, &cancel, || async {
            sqlx::query("SELECT 1").execute(&self.pool).await
        })
        .await
        .map(|_| ())
        .map_err(|e| match e {
            RetryError::Failed(err) | RetryError::Exhausted { last: err, .. } => err.into(),
            RetryError::Cancelled => Error::Unavailable("ping cancelled".into()),
        })
    }

    async fn delete(&self, name: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM metrics WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

async fn upsert_one(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    data: &Data,
) -> Result<(), Error> {
    // Mirrors spec.md's `INSERT ... ON CONFLICT(name) DO UPDATE SET
    // value=excluded.value, delta=stored.delta+excluded.delta`. A kind
    // change must replace rather than merge (spec.md §9), so the delta add
    // only applies when the stored row is already a counter.
    sqlx::query(
        r#"
        INSERT INTO metrics (name, type, value, delta)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE SET
            type  = excluded.type,
            value = excluded.value,
            delta = CASE
                WHEN metrics.type = 'counter' AND excluded.type = 'counter'
                    THEN COALESCE(metrics.delta, 0) + COALESCE(excluded.delta, 0)
                ELSE excluded.delta
            END
        "#,
    )
    .bind(&data.name)
    .bind(PostgresStorage::kind_str(data.kind))
    .bind(data.value)
    .bind(data.delta)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
