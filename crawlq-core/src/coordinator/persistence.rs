//! Postgres-backed backlog access.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use super::backlog::BacklogStore;
use crate::types::{BacklogTotals, DomainBacklog, DomainKey, WorkItem};
use crate::{CoordinatorError, Result};

const REQUIRED_TABLES: [&str; 2] = ["candidate_links", "sources"];

#[derive(Clone, Debug)]
pub struct PostgresBacklogStore {
    pool: PgPool,
}

impl PostgresBacklogStore {
    /// Wraps `pool` after a connectivity and schema check.
    pub async fn new(pool: PgPool) -> Result<Self> {
        let store = Self { pool };
        store.verify().await?;
        info!("Backlog store connected to Postgres");
        Ok(store)
    }

    /// Wraps `pool` without touching the database.
    pub fn new_unchecked(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check plus presence of the backlog tables.
    pub async fn verify(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                CoordinatorError::Backlog(format!(
                    "backlog store failed Postgres health check: {e}"
                ))
            })?;

        for table in REQUIRED_TABLES {
            let present = sqlx::query_scalar::<_, bool>(
                "SELECT to_regclass($1) IS NOT NULL",
            )
            .bind(format!("public.{table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                CoordinatorError::Backlog(format!(
                    "backlog schema validation failed: {e}"
                ))
            })?;

            if !present {
                return Err(CoordinatorError::Backlog(format!(
                    "required table {table} is missing; run `db migrate`"
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BacklogStore for PostgresBacklogStore {
    async fn domains_with_backlog(&self) -> Result<Vec<DomainBacklog>> {
        sqlx::query_as::<_, DomainBacklog>(
            r#"
            SELECT source AS domain, COUNT(*) AS pending
            FROM candidate_links
            WHERE status = 'pending'
            GROUP BY source
            ORDER BY pending DESC, source ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            CoordinatorError::Backlog(format!("backlog domain listing failed: {e}"))
        })
    }

    async fn claim_candidates(
        &self,
        domains: &[DomainKey],
        limit: usize,
    ) -> Result<Vec<WorkItem>> {
        if domains.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let domain_keys: Vec<String> =
            domains.iter().map(|domain| domain.0.clone()).collect();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut tx = self.pool.begin().await.map_err(|e| {
            CoordinatorError::Backlog(format!("claim transaction failed: {e}"))
        })?;

        // Each domain contributes its oldest rows; locked rows are skipped so
        // a concurrent reader never receives the same row. Ranking within a
        // domain interleaves the result across domains.
        let items = sqlx::query_as::<_, WorkItem>(
            r#"
            SELECT picked.id::text AS id,
                   picked.url,
                   picked.source AS domain,
                   COALESCE(s.canonical_name, picked.source) AS canonical_name
            FROM (
                SELECT c.id, c.url, c.source,
                       ROW_NUMBER() OVER (
                           PARTITION BY c.source
                           ORDER BY c.discovered_at, c.id
                       ) AS slot
                FROM unnest($1::text[]) AS d(source)
                CROSS JOIN LATERAL (
                    SELECT cl.id, cl.url, cl.source, cl.discovered_at
                    FROM candidate_links cl
                    WHERE cl.source = d.source
                      AND cl.status = 'pending'
                    ORDER BY cl.discovered_at, cl.id
                    LIMIT $2
                    FOR UPDATE SKIP LOCKED
                ) c
            ) picked
            LEFT JOIN sources s ON s.host = picked.source
            ORDER BY picked.slot, picked.source
            LIMIT $2
            "#,
        )
        .bind(&domain_keys)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            CoordinatorError::Backlog(format!("candidate select failed: {e}"))
        })?;

        tx.commit().await.map_err(|e| {
            CoordinatorError::Backlog(format!("claim commit failed: {e}"))
        })?;

        debug!(domains = domain_keys.len(), rows = items.len(), "candidates read");
        Ok(items)
    }

    async fn totals(&self) -> Result<BacklogTotals> {
        sqlx::query_as::<_, BacklogTotals>(
            r#"
            SELECT COUNT(*) AS total_available,
                   COUNT(DISTINCT source) AS domains_available
            FROM candidate_links
            WHERE status = 'pending'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            CoordinatorError::Backlog(format!("backlog totals query failed: {e}"))
        })
    }
}
