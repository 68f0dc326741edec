//! Results database boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TriageResult;
use crate::record::{CiResult, ResultKind};

/// Read-only view of the CI results database.
///
/// Implementations must return every result of the given kind whose
/// timestamp falls inside the window, that carries a log URL, whose
/// status is not the pass value, restricted to the allowed origins.
/// Query failures propagate; a partially fetched batch is never
/// returned.
#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn failed_with_logs(
        &self,
        kind: ResultKind,
        since: DateTime<Utc>,
        origins: &[String],
    ) -> TriageResult<Vec<CiResult>>;
}
