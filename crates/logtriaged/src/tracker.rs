//! Processed-set tracker.
//!
//! Durable per-result idempotency ledger: once a result id is marked it
//! is never reconsidered by this worker instance. Reprocessing requires
//! deleting the state store. Builds and tests are independent
//! partitions. Not safe for concurrent writers; the deployment must
//! guarantee one live worker per state directory.

use anyhow::{Context, Result};
use logtriage_core::ResultKind;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const STATE_DB_FILE: &str = "processed.sqlite";

pub struct ProcessedSet {
    conn: Mutex<Connection>,
}

impl ProcessedSet {
    /// Open (or create) the ledger inside the state directory.
    pub fn open(state_dir: &Path) -> Result<Self> {
        let db_path = state_dir.join(STATE_DB_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("opening state store {}", db_path.display()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS processed_builds (id TEXT PRIMARY KEY);
             CREATE TABLE IF NOT EXISTS processed_tests (id TEXT PRIMARY KEY);",
        )
        .context("initializing state store schema")?;
        Ok(ProcessedSet {
            conn: Mutex::new(conn),
        })
    }

    fn table(kind: ResultKind) -> &'static str {
        match kind {
            ResultKind::Build => "processed_builds",
            ResultKind::Test => "processed_tests",
        }
    }

    pub fn is_processed(&self, kind: ResultKind, id: &str) -> Result<bool> {
        let query = format!("SELECT 1 FROM {} WHERE id = ?1", Self::table(kind));
        let conn = self.conn.lock().unwrap();
        let found: Option<i64> = conn
            .query_row(&query, params![id], |row| row.get(0))
            .optional()
            .context("querying processed set")?;
        Ok(found.is_some())
    }

    /// Idempotent: marking an already-marked id is a no-op besides a
    /// log line. There is no unmark operation.
    pub fn mark_processed(&self, kind: ResultKind, id: &str) -> Result<()> {
        let insert = format!(
            "INSERT OR IGNORE INTO {} (id) VALUES (?1)",
            Self::table(kind)
        );
        let inserted = self
            .conn
            .lock()
            .unwrap()
            .execute(&insert, params![id])
            .context("marking result processed")?;
        if inserted > 0 {
            info!(result_id = id, kind = %kind, "result marked processed");
        } else {
            debug!(result_id = id, kind = %kind, "result already processed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ProcessedSet::open(dir.path()).unwrap();

        assert!(!tracker.is_processed(ResultKind::Build, "b1").unwrap());
        tracker.mark_processed(ResultKind::Build, "b1").unwrap();
        assert!(tracker.is_processed(ResultKind::Build, "b1").unwrap());
    }

    #[test]
    fn test_mark_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ProcessedSet::open(dir.path()).unwrap();

        tracker.mark_processed(ResultKind::Test, "t1").unwrap();
        tracker.mark_processed(ResultKind::Test, "t1").unwrap();
        assert!(tracker.is_processed(ResultKind::Test, "t1").unwrap());
    }

    #[test]
    fn test_partitions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ProcessedSet::open(dir.path()).unwrap();

        tracker.mark_processed(ResultKind::Build, "x").unwrap();
        assert!(tracker.is_processed(ResultKind::Build, "x").unwrap());
        assert!(!tracker.is_processed(ResultKind::Test, "x").unwrap());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let tracker = ProcessedSet::open(dir.path()).unwrap();
            tracker.mark_processed(ResultKind::Build, "persistent").unwrap();
        }
        let reopened = ProcessedSet::open(dir.path()).unwrap();
        assert!(reopened.is_processed(ResultKind::Build, "persistent").unwrap());
    }
}
