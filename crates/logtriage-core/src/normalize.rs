//! Finding normalization.
//!
//! Turns raw engine output into `Finding` records: hidden fields are
//! stripped, the boot profile's special-case synthetic findings are
//! emitted, and non-fatal noise categories are dropped before any
//! issue is derived.

use serde_json::{json, Map, Value};

use crate::classify::EngineOutput;
use crate::profile::Profile;

/// Error category that never becomes an issue: the kernel returned an
/// error code without an actual failure, which is pure noise.
pub const NOISE_ERROR_TYPE: &str = "linux.kernel.error_return_code";

/// Error type used by the synthetic boot findings.
const BOOT_ERROR_TYPE: &str = "linux.kernel.boot";

const UNCLEAN_BOOT_SUMMARY: &str =
    "WARNING: Unclean boot. Reached prompt but marked as failed.";
const BOOT_INFRA_SUMMARY: &str = "Bootloader did not finish or kernel did not start.";

/// Corrected result status proposed by the boot special cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposedStatus {
    /// Boot reached a prompt; the failure mark is a false negative.
    Pass,
    /// The boot never started; infrastructure failure.
    Miss,
}

impl ProposedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposedStatus::Pass => "PASS",
            ProposedStatus::Miss => "MISS",
        }
    }
}

/// One normalized error finding, real or synthetic.
#[derive(Debug, Clone)]
pub struct Finding {
    pub error_type: String,
    pub summary: Option<String>,
    /// Content-derived identifier of the error pattern. Empty
    /// signatures never produce issues.
    pub signature: String,
    pub log_excerpt: String,
    /// Key attributes contributing to the signature, resolved to their
    /// values.
    pub signature_fields: Map<String, Value>,
    /// Remaining externally meaningful attributes (target, src_file,
    /// script, ...).
    pub attributes: Map<String, Value>,
    /// Provenance.
    pub parser: String,
    pub engine_version: String,
}

impl Finding {
    /// Whether this finding is the suppressed noise category.
    pub fn is_noise(&self) -> bool {
        self.error_type == NOISE_ERROR_TYPE
    }

    /// Full diagnostic payload embedded in an issue's `misc` field.
    /// The signature is deliberately omitted; it already forms the
    /// issue id.
    pub fn payload(&self) -> Value {
        let mut error = Map::new();
        for (key, value) in &self.attributes {
            error.insert(key.clone(), value.clone());
        }
        error.insert("error_type".into(), Value::String(self.error_type.clone()));
        if let Some(summary) = &self.summary {
            error.insert("error_summary".into(), Value::String(summary.clone()));
        }
        error.insert("log_excerpt".into(), Value::String(self.log_excerpt.clone()));
        error.insert(
            "signature_fields".into(),
            Value::Object(self.signature_fields.clone()),
        );
        json!({
            "version": self.engine_version,
            "parser": self.parser,
            "error": error,
        })
    }
}

/// Output of one normalization run.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub findings: Vec<Finding>,
    /// Corrected status proposed by the boot special cases, if any.
    pub proposed_status: Option<ProposedStatus>,
}

/// Whether a raw attribute value is worth keeping (the engine pads
/// records with nulls and empty strings).
fn is_visible(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Resolve a signature-field name list against a source record.
fn resolve_signature_fields(names: &[String], source: &Map<String, Value>) -> Map<String, Value> {
    let mut fields = Map::new();
    for name in names {
        if let Some(value) = source.get(name) {
            fields.insert(name.clone(), value.clone());
        }
    }
    fields
}

/// Synthetic finding carrying the boot-state signature computed by the
/// engine; it has no log excerpt of its own.
fn boot_special_finding(output: &EngineOutput, profile: Profile, summary: &str) -> Finding {
    Finding {
        error_type: BOOT_ERROR_TYPE.to_string(),
        summary: Some(summary.to_string()),
        signature: output.signature.clone(),
        log_excerpt: String::new(),
        signature_fields: resolve_signature_fields(&output.signature_fields, &output.state),
        attributes: Map::new(),
        parser: profile.parser().to_string(),
        engine_version: output.version.clone(),
    }
}

/// Normalize one engine output into findings.
///
/// For the boot profile the special-case findings are emitted before
/// the engine's own error list: the engine alone cannot distinguish a
/// completed boot that was marked failed from a boot that never
/// started.
pub fn normalize(output: &EngineOutput, profile: Profile) -> Normalized {
    let mut findings = Vec::new();
    let mut proposed_status = None;

    if profile == Profile::GenericBoot {
        if output.state_flag("linux.boot.prompt") {
            findings.push(boot_special_finding(output, profile, UNCLEAN_BOOT_SUMMARY));
            proposed_status = Some(ProposedStatus::Pass);
        } else if !output.state_flag("bootloader.done")
            || !output.state_flag("linux.boot.kernel_started")
        {
            findings.push(boot_special_finding(output, profile, BOOT_INFRA_SUMMARY));
            proposed_status = Some(ProposedStatus::Miss);
        }
    }

    for raw in &output.errors {
        let signature = string_field(raw, "_signature").unwrap_or_default();
        let log_excerpt = string_field(raw, "_report").unwrap_or_default();
        let field_names: Vec<String> = raw
            .get("_signature_fields")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // Keep only externally meaningful attributes; hidden fields are
        // prefixed with an underscore.
        let mut attributes = Map::new();
        for (key, value) in raw {
            if key.starts_with('_') || key == "error_type" || key == "error_summary" {
                continue;
            }
            if is_visible(value) {
                attributes.insert(key.clone(), value.clone());
            }
        }
        // The signature location is hidden in the raw record but useful
        // downstream for folding related issues.
        if let Some(loc) = string_field(raw, "_signature_loc") {
            attributes.insert("signature_loc".into(), Value::String(loc));
        }

        findings.push(Finding {
            error_type: string_field(raw, "error_type").unwrap_or_default(),
            summary: string_field(raw, "error_summary").filter(|s| !s.is_empty()),
            signature,
            log_excerpt,
            signature_fields: resolve_signature_fields(&field_names, raw),
            attributes,
            parser: profile.parser().to_string(),
            engine_version: output.version.clone(),
        });
    }

    // Noise suppression: non-fatal error-return-code findings never
    // become issues.
    findings.retain(|finding| !finding.is_noise());

    Normalized {
        findings,
        proposed_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boot_output(state: Value) -> EngineOutput {
        let mut raw = json!({
            "errors": [],
            "_version": "1.4.0",
            "_signature": "bootsig",
            "_signature_fields": ["bootloader.done"],
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut raw, state) {
            base.extend(extra);
        }
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_unclean_boot_proposes_pass() {
        let output = boot_output(json!({
            "bootloader.done": true,
            "linux.boot.kernel_started": true,
            "linux.boot.prompt": true,
        }));
        let normalized = normalize(&output, Profile::GenericBoot);
        assert_eq!(normalized.findings.len(), 1);
        assert_eq!(normalized.proposed_status, Some(ProposedStatus::Pass));
        let finding = &normalized.findings[0];
        assert_eq!(finding.error_type, "linux.kernel.boot");
        assert_eq!(finding.signature, "bootsig");
        assert!(finding.summary.as_deref().unwrap().contains("Unclean boot"));
        assert_eq!(
            finding.signature_fields.get("bootloader.done"),
            Some(&json!(true))
        );
    }

    #[test]
    fn test_incomplete_boot_proposes_miss() {
        let output = boot_output(json!({ "bootloader.done": false }));
        let normalized = normalize(&output, Profile::GenericBoot);
        assert_eq!(normalized.findings.len(), 1);
        assert_eq!(normalized.proposed_status, Some(ProposedStatus::Miss));
        assert!(normalized.findings[0]
            .summary
            .as_deref()
            .unwrap()
            .contains("Bootloader did not finish"));
    }

    #[test]
    fn test_no_special_case_outside_boot_profile() {
        let output = boot_output(json!({ "bootloader.done": false }));
        let normalized = normalize(&output, Profile::Kbuild);
        assert!(normalized.findings.is_empty());
        assert_eq!(normalized.proposed_status, None);
    }

    #[test]
    fn test_hidden_fields_are_stripped() {
        let output: EngineOutput = serde_json::from_value(json!({
            "errors": [{
                "error_type": "kbuild.compiler.error",
                "error_summary": "implicit declaration",
                "target": "drivers/gpu/drm",
                "src_file": "gpu.c",
                "empty_field": "",
                "null_field": null,
                "_signature": "sig1",
                "_signature_loc": "gpu.c:42",
                "_report": "gpu.c:42: error: implicit declaration",
                "_signature_fields": ["target", "src_file"],
            }],
            "_version": "1.4.0",
        }))
        .unwrap();

        let normalized = normalize(&output, Profile::Kbuild);
        assert_eq!(normalized.findings.len(), 1);
        let finding = &normalized.findings[0];
        assert_eq!(finding.signature, "sig1");
        assert_eq!(finding.log_excerpt, "gpu.c:42: error: implicit declaration");
        assert_eq!(finding.attributes.get("target"), Some(&json!("drivers/gpu/drm")));
        assert_eq!(finding.attributes.get("signature_loc"), Some(&json!("gpu.c:42")));
        assert!(!finding.attributes.contains_key("empty_field"));
        assert!(!finding.attributes.contains_key("null_field"));
        assert!(!finding.attributes.contains_key("_report"));
        assert_eq!(finding.signature_fields.get("src_file"), Some(&json!("gpu.c")));

        let payload = finding.payload();
        assert_eq!(payload["parser"], "kbuild");
        assert_eq!(payload["error"]["error_type"], "kbuild.compiler.error");
        assert!(payload["error"].get("signature").is_none());
    }

    #[test]
    fn test_noise_findings_are_dropped() {
        let output: EngineOutput = serde_json::from_value(json!({
            "errors": [
                {
                    "error_type": "linux.kernel.error_return_code",
                    "_signature": "noisy-but-signed",
                },
                {
                    "error_type": "linux.kernel.panic",
                    "_signature": "sig-panic",
                },
            ],
        }))
        .unwrap();

        let normalized = normalize(&output, Profile::GenericBoot);
        // The boot special case fires too (no milestones reached).
        let real: Vec<_> = normalized
            .findings
            .iter()
            .filter(|f| f.error_type == "linux.kernel.panic")
            .collect();
        assert_eq!(real.len(), 1);
        assert!(normalized.findings.iter().all(|f| !f.is_noise()));
    }
}
