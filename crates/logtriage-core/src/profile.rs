//! Parser profiles and the per-profile issue/incident policy table.
//!
//! Each profile names the classification-engine parser to run and the
//! fixed overrides applied to issues and incidents derived under it.
//! Test results default to the boot profile; an eligibility rule may
//! override this per origin (see `eligibility::Rule::parser`).

use crate::record::ResultKind;
use serde::{Deserialize, Serialize};

/// Which result-reference field an incident carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentIdField {
    BuildId,
    TestId,
}

/// A classification parser profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Kernel build logs.
    Kbuild,
    /// Generic Linux boot logs.
    GenericBoot,
    /// Kselftest run logs.
    Kselftest,
}

/// Fixed policy applied when deriving issues/incidents under a profile.
#[derive(Debug, Clone, Copy)]
pub struct KindPolicy {
    /// Field of the incident that references the triggering result.
    pub incident_id_field: IncidentIdField,
    /// Issue-level override: build-kind issues invalidate the build.
    pub build_valid: Option<bool>,
    /// Issue-level override: test-kind issues force a test status.
    pub test_status: Option<&'static str>,
}

impl Profile {
    /// The engine parser name for this profile.
    pub fn parser(&self) -> &'static str {
        match self {
            Profile::Kbuild => "kbuild",
            Profile::GenericBoot => "generic_linux_boot",
            Profile::Kselftest => "test_kselftest",
        }
    }

    /// Resolve a profile from a configuration name. Accepts both the
    /// short policy name and the engine parser name.
    pub fn from_name(name: &str) -> Option<Profile> {
        match name {
            "build" | "kbuild" => Some(Profile::Kbuild),
            "boot" | "generic_linux_boot" => Some(Profile::GenericBoot),
            "kselftest" | "test_kselftest" => Some(Profile::Kselftest),
            _ => None,
        }
    }

    /// Default profile for a result kind when no rule overrides it.
    pub fn default_for(kind: ResultKind) -> Profile {
        match kind {
            ResultKind::Build => Profile::Kbuild,
            // All tests currently route to the boot parser unless an
            // eligibility rule names another profile.
            ResultKind::Test => Profile::GenericBoot,
        }
    }

    /// The issue/incident policy for this profile.
    pub fn policy(&self) -> KindPolicy {
        match self {
            Profile::Kbuild => KindPolicy {
                incident_id_field: IncidentIdField::BuildId,
                build_valid: Some(false),
                test_status: None,
            },
            Profile::GenericBoot | Profile::Kselftest => KindPolicy {
                incident_id_field: IncidentIdField::TestId,
                build_valid: None,
                test_status: Some("FAIL"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_names() {
        assert_eq!(Profile::Kbuild.parser(), "kbuild");
        assert_eq!(Profile::GenericBoot.parser(), "generic_linux_boot");
        assert_eq!(Profile::Kselftest.parser(), "test_kselftest");
    }

    #[test]
    fn test_from_name_accepts_both_spellings() {
        assert_eq!(Profile::from_name("build"), Some(Profile::Kbuild));
        assert_eq!(Profile::from_name("kbuild"), Some(Profile::Kbuild));
        assert_eq!(Profile::from_name("boot"), Some(Profile::GenericBoot));
        assert_eq!(Profile::from_name("kselftest"), Some(Profile::Kselftest));
        assert_eq!(Profile::from_name("bogus"), None);
    }

    #[test]
    fn test_defaults_per_kind() {
        assert_eq!(Profile::default_for(ResultKind::Build), Profile::Kbuild);
        assert_eq!(Profile::default_for(ResultKind::Test), Profile::GenericBoot);
    }

    #[test]
    fn test_policy_overrides() {
        let build = Profile::Kbuild.policy();
        assert_eq!(build.incident_id_field, IncidentIdField::BuildId);
        assert_eq!(build.build_valid, Some(false));
        assert_eq!(build.test_status, None);

        let boot = Profile::GenericBoot.policy();
        assert_eq!(boot.incident_id_field, IncidentIdField::TestId);
        assert_eq!(boot.build_valid, None);
        assert_eq!(boot.test_status, Some("FAIL"));
    }
}
