//! Classification engine boundary.
//!
//! The engine is an external black box that parses a log under a named
//! profile and returns structured findings. `EngineOutput` is the shape
//! of that JSON; the `Classifier` trait keeps the core ignorant of how
//! the engine is invoked (subprocess, embedded library, network call).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::TriageResult;
use crate::profile::Profile;

/// Structured output of one classification-engine invocation.
///
/// Keys prefixed with an underscore are the engine's internal fields;
/// the normalizer strips them from anything user-facing. Parser state
/// that is not explicitly modeled (boot milestones like
/// `bootloader.done`) lands in `state`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineOutput {
    /// Raw error records, one JSON object per detected error.
    #[serde(default)]
    pub errors: Vec<Map<String, Value>>,

    /// Engine version string.
    #[serde(default, rename = "_version")]
    pub version: String,

    /// Signature over the parser's derived state (used by the boot
    /// special-case findings).
    #[serde(default, rename = "_signature")]
    pub signature: String,

    /// Names of the state fields contributing to `signature`.
    #[serde(default, rename = "_signature_fields")]
    pub signature_fields: Vec<String>,

    /// Remaining parser state.
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

impl EngineOutput {
    /// Whether a boolean state flag is present and true.
    pub fn state_flag(&self, key: &str) -> bool {
        matches!(self.state.get(key), Some(Value::Bool(true)))
    }
}

/// Narrow interface to the classification engine.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Parse `log` with the given profile's parser.
    ///
    /// Errors are surfaced, never retried here: the caller leaves the
    /// result unmarked so the next cycle picks it up again.
    async fn classify(&self, log: &str, profile: Profile) -> TriageResult<EngineOutput>;
}
