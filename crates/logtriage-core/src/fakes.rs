//! In-memory fakes for the external-collaborator traits (testing only)
//!
//! Provides `MemoryResultSource` and `ScriptedClassifier` that satisfy
//! the trait contracts without a database or a classification engine.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::classify::{Classifier, EngineOutput};
use crate::error::{TriageError, TriageResult};
use crate::profile::Profile;
use crate::record::{CiResult, ResultKind};
use crate::source::ResultSource;

// ---------------------------------------------------------------------------
// MemoryResultSource
// ---------------------------------------------------------------------------

/// In-memory result source applying the same selection contract as the
/// real database query.
#[derive(Debug, Default)]
pub struct MemoryResultSource {
    results: Mutex<Vec<CiResult>>,
}

impl MemoryResultSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: CiResult) {
        self.results.lock().unwrap().push(result);
    }
}

#[async_trait]
impl ResultSource for MemoryResultSource {
    async fn failed_with_logs(
        &self,
        kind: ResultKind,
        since: DateTime<Utc>,
        origins: &[String],
    ) -> TriageResult<Vec<CiResult>> {
        let results = self.results.lock().unwrap();
        Ok(results
            .iter()
            .filter(|r| {
                r.kind == kind
                    && r.timestamp > since
                    && r.log_url.is_some()
                    && r.status.as_deref() != Some("PASS")
                    && origins.contains(&r.origin)
            })
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedClassifier
// ---------------------------------------------------------------------------

/// Classifier returning a pre-scripted output per parser profile.
/// Profiles without a script yield an engine error, which exercises the
/// caller's failure path.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    outputs: Mutex<HashMap<&'static str, EngineOutput>>,
    calls: Mutex<u32>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, profile: Profile, output: EngineOutput) {
        self.outputs.lock().unwrap().insert(profile.parser(), output);
    }

    /// Number of classify calls observed.
    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _log: &str, profile: Profile) -> TriageResult<EngineOutput> {
        *self.calls.lock().unwrap() += 1;
        self.outputs
            .lock()
            .unwrap()
            .get(profile.parser())
            .cloned()
            .ok_or_else(|| {
                TriageError::Engine(format!("no scripted output for {}", profile.parser()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn result(id: &str, kind: ResultKind, status: &str, log_url: Option<&str>) -> CiResult {
        CiResult {
            id: id.to_string(),
            origin: "maestro".to_string(),
            kind,
            path: None,
            status: Some(status.to_string()),
            log_url: log_url.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_source_applies_selection_contract() {
        let source = MemoryResultSource::new();
        source.push(result("b1", ResultKind::Build, "FAIL", Some("https://x/log")));
        source.push(result("b2", ResultKind::Build, "PASS", Some("https://x/log")));
        source.push(result("b3", ResultKind::Build, "FAIL", None));
        source.push(result("t1", ResultKind::Test, "FAIL", Some("https://x/log")));

        let since = Utc::now() - Duration::hours(24);
        let origins = vec!["maestro".to_string()];
        let builds = source
            .failed_with_logs(ResultKind::Build, since, &origins)
            .await
            .unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].id, "b1");

        let none = source
            .failed_with_logs(ResultKind::Build, since, &["other".to_string()])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_scripted_classifier() {
        let classifier = ScriptedClassifier::new();
        classifier.script(Profile::Kbuild, EngineOutput::default());

        assert!(classifier.classify("log", Profile::Kbuild).await.is_ok());
        assert!(classifier.classify("log", Profile::GenericBoot).await.is_err());
        assert_eq!(classifier.calls(), 2);
    }
}
