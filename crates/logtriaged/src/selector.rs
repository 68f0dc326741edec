//! Postgres result selector.
//!
//! Read-only queries against the results database's `builds` and
//! `tests` tables. The worker never writes to these tables; processed
//! state lives in the local tracker instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logtriage_core::{CiResult, ResultKind, ResultSource, TriageError, TriageResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

pub struct PgResultSource {
    pool: PgPool,
}

impl PgResultSource {
    /// Connect to the results database. One connection is enough: the
    /// worker is a single sequential task.
    pub async fn connect(url: &str) -> TriageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| TriageError::Query(format!("connecting to results database: {}", e)))?;
        Ok(PgResultSource { pool })
    }
}

#[async_trait]
impl ResultSource for PgResultSource {
    async fn failed_with_logs(
        &self,
        kind: ResultKind,
        since: DateTime<Utc>,
        origins: &[String],
    ) -> TriageResult<Vec<CiResult>> {
        // Tests carry a suite path; builds do not.
        let query = match kind {
            ResultKind::Build => {
                "SELECT id, origin, status, log_url, NULL::text AS path, \"_timestamp\" \
                 FROM builds \
                 WHERE \"_timestamp\" > $1 AND log_url IS NOT NULL \
                 AND status != 'PASS' AND origin = ANY($2)"
            }
            ResultKind::Test => {
                "SELECT id, origin, status, log_url, path, \"_timestamp\" \
                 FROM tests \
                 WHERE \"_timestamp\" > $1 AND log_url IS NOT NULL \
                 AND status != 'PASS' AND origin = ANY($2)"
            }
        };

        let rows = sqlx::query(query)
            .bind(since)
            .bind(origins.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TriageError::Query(format!("selecting {} results: {}", kind, e)))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(CiResult {
                id: row
                    .try_get("id")
                    .map_err(|e| TriageError::Query(e.to_string()))?,
                origin: row
                    .try_get("origin")
                    .map_err(|e| TriageError::Query(e.to_string()))?,
                kind,
                path: row
                    .try_get("path")
                    .map_err(|e| TriageError::Query(e.to_string()))?,
                status: row
                    .try_get("status")
                    .map_err(|e| TriageError::Query(e.to_string()))?,
                log_url: row
                    .try_get("log_url")
                    .map_err(|e| TriageError::Query(e.to_string()))?,
                timestamp: row
                    .try_get("_timestamp")
                    .map_err(|e| TriageError::Query(e.to_string()))?,
            });
        }
        debug!(kind = %kind, count = results.len(), "selected unprocessed results");
        Ok(results)
    }
}
