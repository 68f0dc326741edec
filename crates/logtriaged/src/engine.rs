//! Subprocess classification adapter.
//!
//! Invokes the classification engine as a child process: the log goes
//! to stdin, the parser profile is passed as an argument and the engine
//! answers with one JSON document on stdout. The core stays ignorant of
//! this arrangement behind the `Classifier` trait.

use async_trait::async_trait;
use logtriage_core::{Classifier, EngineOutput, Profile, TriageError, TriageResult};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

pub struct CommandClassifier {
    command: Vec<String>,
}

impl CommandClassifier {
    /// Build from a command line, e.g. `"logspec --json"`. The profile
    /// is appended as `--parser <name>` on every invocation.
    pub fn new(command_line: &str) -> TriageResult<Self> {
        let command: Vec<String> = command_line.split_whitespace().map(str::to_string).collect();
        if command.is_empty() {
            return Err(TriageError::Config(
                "classification engine command is empty".to_string(),
            ));
        }
        Ok(CommandClassifier { command })
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    async fn classify(&self, log: &str, profile: Profile) -> TriageResult<EngineOutput> {
        debug!(parser = profile.parser(), bytes = log.len(), "invoking classification engine");

        let mut child = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg("--parser")
            .arg(profile.parser())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TriageError::Engine(format!("spawning {}: {}", self.command[0], e)))?;

        // Feed stdin concurrently with draining stdout, or a large log
        // can deadlock both pipes.
        let stdin = child.stdin.take();
        let log_bytes = log.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                // A closed pipe just means the engine stopped reading;
                // its exit status tells the real story.
                let _ = stdin.write_all(&log_bytes).await;
            }
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TriageError::Engine(format!("waiting for engine: {}", e)))?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TriageError::Engine(format!(
                "engine exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TriageError::Engine(format!("invalid engine output: {}", e)))
    }
}
