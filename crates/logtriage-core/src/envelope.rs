//! Submission envelope for the downstream ingester.
//!
//! The ingester consumes whole files from the spool directory, each
//! holding one envelope. Its schema rejects explicit nulls, so every
//! null field is stripped before serialization.

use serde::Serialize;
use serde_json::Value;

use crate::error::TriageResult;
use crate::identity::{Incident, Issue};

/// Schema version tag understood by the downstream ingester.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

pub const SCHEMA_VERSION: SchemaVersion = SchemaVersion { major: 4, minor: 5 };

/// One spool submission. The checkout/build/test arrays are always
/// empty: this worker only ever contributes issues and incidents.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub checkouts: Vec<Value>,
    pub builds: Vec<Value>,
    pub tests: Vec<Value>,
    pub issues: Vec<Issue>,
    pub incidents: Vec<Incident>,
    pub version: SchemaVersion,
}

impl Envelope {
    pub fn new(issues: Vec<Issue>, incidents: Vec<Incident>) -> Self {
        Envelope {
            checkouts: Vec::new(),
            builds: Vec::new(),
            tests: Vec::new(),
            issues,
            incidents,
            version: SCHEMA_VERSION,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.incidents.is_empty()
    }

    /// Compact JSON with all null fields removed.
    pub fn to_json(&self) -> TriageResult<String> {
        let value = strip_nulls(serde_json::to_value(self)?);
        Ok(value.to_string())
    }

    /// Indented JSON with all null fields removed, for dry-run
    /// inspection in the logs.
    pub fn to_json_pretty(&self) -> TriageResult<String> {
        let value = strip_nulls(serde_json::to_value(self)?);
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Recursively drop null object entries.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
