use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vectl_core::ReadinessProbe;

use crate::record::{SearchHit, SearchRecord};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../migrations");

/// pgvector-backed `search` table.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to postgres")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Enable the vector extension and apply pending migrations.
    pub async fn prepare(&self) -> Result<()> {
        ensure_extensions(&self.pool).await?;
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Revert every applied migration.
    pub async fn revert(&self) -> Result<()> {
        MIGRATOR.undo(&self.pool, 0).await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn insert(tx: &mut Transaction<'_, Postgres>, record: &SearchRecord) -> Result<()> {
        sqlx::query("insert into search (id, content, vector) values ($1, $2, $3)")
            .bind(record.id)
            .bind(&record.content)
            .bind(&record.vector)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("select count(*) from search")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Rows closest to `vector` by cosine distance with similarity at or above
    /// `threshold`.
    pub async fn search(
        &self,
        vector: Vector,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        let limit = query_limit(top_k)?;
        let rows: Vec<HitRow> = sqlx::query_as(
            r#"
            select id, content, created_at, 1 - (vector <=> $1) as similarity
            from search
            where 1 - (vector <=> $1) >= $2
            order by vector <=> $1
            limit $3
            "#,
        )
        .bind(vector)
        .bind(f64::from(threshold))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SearchHit::from).collect())
    }
}

/// `LIMIT` is a signed bigint in postgres.
fn query_limit(top_k: usize) -> Result<i64> {
    i64::try_from(top_k).with_context(|| format!("top-k {top_k} is too large"))
}

#[derive(sqlx::FromRow)]
struct HitRow {
    id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    similarity: f64,
}

impl From<HitRow> for SearchHit {
    fn from(row: HitRow) -> Self {
        SearchHit {
            id: row.id.to_string(),
            content: row.content,
            similarity: row.similarity as f32,
            created_at: Some(row.created_at),
        }
    }
}

async fn ensure_extensions(pool: &PgPool) -> Result<()> {
    sqlx::query("create extension if not exists vector")
        .execute(pool)
        .await?;
    Ok(())
}

async fn probe_once(database_url: &str) -> Result<()> {
    let mut conn = PgConnection::connect(database_url).await?;
    let one: i32 = sqlx::query_scalar("select 1").fetch_one(&mut conn).await?;
    conn.close().await?;
    if one != 1 {
        bail!("unexpected readiness reply {one}");
    }
    Ok(())
}

/// Poll the database the way the container runtime polls its healthcheck:
/// every `interval`, each attempt bounded by `timeout`, giving up after
/// `retries` consecutive failures. Failures inside `start_period` do not
/// count. Returns the number of attempts made.
pub async fn wait_until_ready(database_url: &str, probe: &ReadinessProbe) -> Result<u32> {
    let started = Instant::now();
    let mut attempts = 0u32;
    let mut failures = 0u32;

    loop {
        attempts += 1;
        let outcome = match tokio::time::timeout(probe.timeout, probe_once(database_url)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("no reply within {:?}", probe.timeout)),
        };

        match outcome {
            Ok(()) => {
                info!(attempts, "database is ready");
                return Ok(attempts);
            }
            Err(err) if started.elapsed() < probe.start_period => {
                debug!(attempt = attempts, error = %err, "not ready during start period");
            }
            Err(err) => {
                failures += 1;
                warn!(attempt = attempts, error = %err, "database not ready");
                if failures >= probe.retries.max(1) {
                    return Err(err.context(format!(
                        "database not ready after {attempts} attempt(s)"
                    )));
                }
            }
        }

        tokio::time::sleep(probe.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn query_limit_rejects_values_past_bigint() {
        assert_eq!(query_limit(10).unwrap(), 10);
        assert!(query_limit(usize::MAX).is_err());
    }

    fn record(content: &str, vector: Vec<f32>) -> SearchRecord {
        SearchRecord::new(content, Vector::from(vector))
    }

    #[sqlx::test(migrator = "MIGRATOR")]
    #[ignore = "requires pgvector docker image (see README)"]
    async fn insert_count_and_search(pool: PgPool) -> Result<()> {
        let store = PgStore::from_pool(pool);

        let mut tx = store.begin().await?;
        PgStore::insert(&mut tx, &record("north", vec![1.0, 0.0, 0.0])).await?;
        PgStore::insert(&mut tx, &record("east", vec![0.0, 1.0, 0.0])).await?;
        PgStore::insert(&mut tx, &record("mostly north", vec![0.9, 0.1, 0.0])).await?;
        tx.commit().await?;

        assert_eq!(store.count().await?, 3);

        let hits = store
            .search(Vector::from(vec![1.0, 0.0, 0.0]), 10, 0.6)
            .await?;
        let contents: Vec<_> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["north", "mostly north"]);
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert!(hits[0].created_at.is_some());

        Ok(())
    }

    #[sqlx::test(migrator = "MIGRATOR")]
    #[ignore = "requires pgvector docker image (see README)"]
    async fn rolled_back_batch_leaves_no_rows(pool: PgPool) -> Result<()> {
        let store = PgStore::from_pool(pool);

        let mut tx = store.begin().await?;
        PgStore::insert(&mut tx, &record("discarded", vec![1.0, 0.0])).await?;
        tx.rollback().await?;

        assert_eq!(store.count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_database_gives_up_after_retries() {
        let probe = ReadinessProbe {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(500),
            retries: 2,
            start_period: Duration::ZERO,
        };
        // Port 1 on loopback refuses connections immediately.
        let err = wait_until_ready("postgres://postgres:x@127.0.0.1:1/postgres", &probe)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("after 2 attempt(s)"));
    }
}
