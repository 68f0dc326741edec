//! Spool publisher.
//!
//! Serializes one envelope per file into the spool directory for the
//! downstream ingestion daemon. The file is written under a ".temp"
//! suffix and renamed to ".json" as the sole unit of publish; rename
//! within one filesystem is atomic, so a consumer polling the
//! directory only ever observes complete files.

use anyhow::{Context, Result};
use logtriage_core::Envelope;
use rand::RngCore;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct Spool {
    dir: PathBuf,
    prefix: String,
}

impl Spool {
    pub fn new(dir: PathBuf, prefix: impl Into<String>) -> Self {
        Spool {
            dir,
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Publish one envelope and return the final file path.
    ///
    /// The random token keeps concurrent publishes from this process
    /// from colliding; there is no cross-process locking.
    pub fn publish(&self, envelope: &Envelope) -> Result<PathBuf> {
        let payload = envelope.to_json()?;

        let mut token_bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        let token = hex::encode(token_bytes);

        let temp = self.dir.join(format!("{}_{}.json.temp", self.prefix, token));
        let target = self.dir.join(format!("{}_{}.json", self.prefix, token));

        std::fs::write(&temp, payload)
            .with_context(|| format!("writing spool file {}", temp.display()))?;
        std::fs::rename(&temp, &target)
            .with_context(|| format!("publishing spool file {}", target.display()))?;

        info!(
            file = %target.display(),
            issues = envelope.issues.len(),
            incidents = envelope.incidents.len(),
            "envelope published",
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtriage_core::{new_incident, new_issue, Finding, Profile};
    use serde_json::{Map, Value};

    fn envelope() -> Envelope {
        let finding = Finding {
            error_type: "kbuild.compiler.error".to_string(),
            summary: Some("implicit declaration".to_string()),
            signature: "sig-a".to_string(),
            log_excerpt: "gpu.c:42".to_string(),
            signature_fields: Map::new(),
            attributes: Map::new(),
            parser: "kbuild".to_string(),
            engine_version: "1.4.0".to_string(),
        };
        let issue = new_issue(&finding, Profile::Kbuild, "maestro");
        let incident =
            new_incident("b1", &issue.id, issue.version, Profile::Kbuild, "maestro").unwrap();
        Envelope::new(vec![issue], vec![incident])
    }

    fn spool_files(dir: &Path, suffix: &str) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(suffix))
            .collect()
    }

    #[test]
    fn test_publish_leaves_only_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let spool = Spool::new(dir.path().to_path_buf(), "logspec");

        let path = spool.publish(&envelope()).unwrap();
        assert!(path.exists());

        let finals = spool_files(dir.path(), ".json");
        let temps = spool_files(dir.path(), ".json.temp");
        assert_eq!(finals.len(), 1);
        assert!(temps.is_empty());

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("logspec_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_published_payload_parses_and_has_no_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let spool = Spool::new(dir.path().to_path_buf(), "logspec");

        let path = spool.publish(&envelope()).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(parsed["version"]["major"], 4);
        assert_eq!(parsed["issues"][0]["id"], "maestro:sig-a");
        // The ingester rejects nulls; a build issue has no test_status.
        assert!(!raw.contains("null"));
    }

    #[test]
    fn test_unwritable_directory_never_creates_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let spool = Spool::new(missing.clone(), "logspec");

        // Simulated crash before rename: the write fails, and no .json
        // file ever appears.
        assert!(spool.publish(&envelope()).is_err());
        assert!(!missing.exists());
    }
}
