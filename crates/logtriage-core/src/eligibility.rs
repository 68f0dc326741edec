//! Per-origin eligibility rules.
//!
//! The config file maps origin names to rule lists; the first rule
//! whose `type` matches the result's kind decides. A rule may constrain
//! the result path with shell-glob patterns and may name an alternate
//! parser profile for matching results.
//!
//! Results from unlisted origins are never eligible. The caller is
//! expected to mark ineligible results as processed so they are not
//! re-evaluated every cycle; rule changes do not retroactively reopen
//! them.

use glob::Pattern;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::error::{TriageError, TriageResult};
use crate::profile::Profile;
use crate::record::{CiResult, ResultKind};

/// Include-path constraint: a single pattern is treated as a
/// one-element list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncludePath {
    One(String),
    Many(Vec<String>),
}

impl IncludePath {
    pub fn patterns(&self) -> &[String] {
        match self {
            IncludePath::One(pattern) => std::slice::from_ref(pattern),
            IncludePath::Many(patterns) => patterns,
        }
    }

    /// Case-sensitive shell-glob match against any pattern.
    fn matches(&self, path: &str) -> bool {
        self.patterns().iter().any(|pattern| {
            Pattern::new(pattern)
                .map(|p| p.matches(path))
                .unwrap_or(false)
        })
    }
}

/// One eligibility rule within an origin's list.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default)]
    pub include_path: Option<IncludePath>,
    /// Optional parser profile override for results matched by this
    /// rule; tests default to the boot profile otherwise.
    #[serde(default)]
    pub parser: Option<String>,
}

/// Origin -> rules mapping, loaded once at startup and read-only for
/// the lifetime of the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EligibilityConfig {
    #[serde(flatten)]
    origins: BTreeMap<String, Vec<Rule>>,
}

impl EligibilityConfig {
    /// Load the config from a YAML file.
    ///
    /// An absent file is tolerated (empty config, nothing is eligible)
    /// with a warning; a malformed file is a startup error.
    pub fn load(path: &Path) -> TriageResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "eligibility config not found, nothing will be eligible");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TriageError::Config(format!("reading {}: {}", path.display(), e)))?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> TriageResult<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject operator mistakes up front: a bad glob or an unknown
    /// parser name would silently misclassify every result.
    fn validate(&self) -> TriageResult<()> {
        for (origin, rules) in &self.origins {
            for rule in rules {
                if let Some(include_path) = &rule.include_path {
                    for pattern in include_path.patterns() {
                        Pattern::new(pattern).map_err(|e| {
                            TriageError::Config(format!(
                                "origin {}: bad include_path pattern {:?}: {}",
                                origin, pattern, e
                            ))
                        })?;
                    }
                }
                if let Some(parser) = &rule.parser {
                    if Profile::from_name(parser).is_none() {
                        return Err(TriageError::Config(format!(
                            "origin {}: unknown parser profile {:?}",
                            origin, parser
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The configured origins, used to scope the selector query.
    pub fn origins(&self) -> Vec<String> {
        self.origins.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    fn matching_rule(&self, result: &CiResult) -> Option<&Rule> {
        self.origins
            .get(&result.origin)?
            .iter()
            .find(|rule| rule.kind == result.kind)
    }

    /// Whether a result qualifies for processing.
    pub fn is_eligible(&self, result: &CiResult) -> bool {
        match self.matching_rule(result) {
            None => false,
            Some(rule) => match &rule.include_path {
                None => true,
                Some(include_path) => include_path.matches(result.path.as_deref().unwrap_or("")),
            },
        }
    }

    /// Parser profile for an eligible result: the matching rule's
    /// override if any, the kind's default otherwise.
    pub fn profile_for(&self, result: &CiResult) -> Profile {
        self.matching_rule(result)
            .and_then(|rule| rule.parser.as_deref())
            .and_then(Profile::from_name)
            .unwrap_or_else(|| Profile::default_for(result.kind))
    }
}
