//! Result records read from the CI results database.
//!
//! The results database is an external collaborator; this crate only ever
//! reads these records and never writes them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two result tables the triage worker scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Build,
    Test,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Build => "build",
            ResultKind::Test => "test",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One build or test outcome record, the unit of processing.
///
/// `path` is the hierarchical test-suite location and is only populated
/// for test-kind results. `status` uses the database's vocabulary
/// (`PASS`, `FAIL`, `MISS`, ...); the selector already excludes `PASS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiResult {
    pub id: String,
    pub origin: String,
    pub kind: ResultKind,
    pub path: Option<String>,
    pub status: Option<String>,
    pub log_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}
