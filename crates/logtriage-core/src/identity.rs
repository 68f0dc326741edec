//! Issue/incident identity, derivation and batch dedup.
//!
//! Identity is content-derived and stable: the same origin and
//! signature always yield the same issue id, and the same
//! (result, issue, version) triple always yields the same incident id.
//! Re-deriving a finding therefore never mints new records.

use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::error::TriageResult;
use crate::normalize::Finding;
use crate::profile::{IncidentIdField, Profile};

/// Issue version emitted by this worker. A deliberate policy change in
/// classification logic would bump this; the derivation pipeline never
/// does so on its own.
pub const ISSUE_VERSION: u32 = 1;

const INCIDENT_COMMENT: &str = "incident automatically generated from log classification";

/// Culprit flags attached to every issue.
///
/// Code is the default culprit; this needs review whenever the
/// classification engine is upgraded.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Culprit {
    pub code: bool,
    pub harness: bool,
    pub tool: bool,
}

impl Default for Culprit {
    fn default() -> Self {
        Culprit {
            code: true,
            harness: false,
            tool: false,
        }
    }
}

/// Catalogue entry for one distinct failure signature.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub id: String,
    pub version: u32,
    pub origin: String,
    pub comment: String,
    /// Full diagnostic payload under the `logspec` key.
    pub misc: Value,
    pub culprit: Culprit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_status: Option<String>,
}

/// Evidence that one result exhibited one issue.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: String,
    pub issue_id: String,
    pub issue_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    pub comment: String,
    pub origin: String,
    pub present: bool,
}

/// Build a new issue from a normalized finding.
///
/// The comment concatenates summary, target and source file (each only
/// when present) followed by a provenance tag naming the parser and
/// error type.
pub fn new_issue(finding: &Finding, profile: Profile, origin: &str) -> Issue {
    let mut comment = String::new();
    if let Some(summary) = &finding.summary {
        comment.push_str(summary);
    }
    if let Some(target) = finding.attributes.get("target").and_then(Value::as_str) {
        comment.push_str(&format!(" in {}", target));
        if let Some(src_file) = finding.attributes.get("src_file").and_then(Value::as_str) {
            comment.push_str(&format!(" ({})", src_file));
        } else if let Some(script) = finding.attributes.get("script").and_then(Value::as_str) {
            comment.push_str(&format!(" ({})", script));
        }
    }
    if !comment.is_empty() {
        comment.push(' ');
    }
    comment.push_str(&format!(
        "[logspec:{},{}]",
        finding.parser, finding.error_type
    ));

    let policy = profile.policy();
    Issue {
        id: format!("{}:{}", origin, finding.signature),
        version: ISSUE_VERSION,
        origin: origin.to_string(),
        comment,
        misc: serde_json::json!({ "logspec": finding.payload() }),
        culprit: Culprit::default(),
        build_valid: policy.build_valid,
        test_status: policy.test_status.map(str::to_string),
    }
}

/// JSON rendering of the (result, issue, version) triple hashed into
/// the incident id. Elements are separated by ", " so ids stay
/// byte-compatible with records minted by earlier deployments of this
/// pipeline.
fn incident_id_preimage(
    result_id: &str,
    issue_id: &str,
    issue_version: u32,
) -> TriageResult<String> {
    Ok(format!(
        "[{}, {}, {}]",
        serde_json::to_string(result_id)?,
        serde_json::to_string(issue_id)?,
        issue_version
    ))
}

/// Build a new incident linking a result to an issue occurrence.
///
/// The id hashes the JSON-serialized (result, issue, version) triple,
/// prefixed with the origin, so identical inputs always reproduce the
/// same id.
pub fn new_incident(
    result_id: &str,
    issue_id: &str,
    issue_version: u32,
    profile: Profile,
    origin: &str,
) -> TriageResult<Incident> {
    let components = incident_id_preimage(result_id, issue_id, issue_version)?;
    let mut hasher = Sha1::new();
    hasher.update(components.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let policy = profile.policy();
    let (build_id, test_id) = match policy.incident_id_field {
        IncidentIdField::BuildId => (Some(result_id.to_string()), None),
        IncidentIdField::TestId => (None, Some(result_id.to_string())),
    };

    Ok(Incident {
        id: format!("{}:{}", origin, digest),
        issue_id: issue_id.to_string(),
        issue_version,
        build_id,
        test_id,
        comment: INCIDENT_COMMENT.to_string(),
        origin: origin.to_string(),
        present: true,
    })
}

/// Issues and incidents derived from one result's findings.
#[derive(Debug, Clone, Default)]
pub struct Derivation {
    pub issues: Vec<Issue>,
    pub incidents: Vec<Incident>,
}

impl Derivation {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.incidents.is_empty()
    }
}

/// Derive issues and incidents for a batch of findings.
///
/// Findings with an empty signature are skipped. Issues are collapsed
/// by id afterwards (duplicates in one batch derive from the same
/// signature and are equivalent; the later entry wins in place).
/// Incidents are never deduplicated: one result may legitimately match
/// several distinct issues.
pub fn derive(
    findings: &[Finding],
    result_id: &str,
    profile: Profile,
    origin: &str,
) -> TriageResult<Derivation> {
    let mut issues: Vec<Issue> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut incidents = Vec::new();

    for finding in findings {
        if finding.signature.is_empty() {
            continue;
        }
        let issue = new_issue(finding, profile, origin);
        incidents.push(new_incident(
            result_id,
            &issue.id,
            issue.version,
            profile,
            origin,
        )?);
        match seen.get(&issue.id) {
            Some(&index) => issues[index] = issue,
            None => {
                seen.insert(issue.id.clone(), issues.len());
                issues.push(issue);
            }
        }
    }

    Ok(Derivation { issues, incidents })
}
