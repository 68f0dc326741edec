//! LogTriage Core - CI log triage domain model
//!
//! Provides the derivation pipeline that turns classification-engine
//! findings into publishable records:
//! - Eligibility rules deciding which results are processed at all
//! - Normalization of raw engine output into findings (including the
//!   boot special cases and noise suppression)
//! - Stable, content-derived issue/incident identity with batch dedup
//! - The submission envelope handed to the downstream ingester
//!
//! I/O stays out of this crate: the results database and the
//! classification engine are reached through the `ResultSource` and
//! `Classifier` traits, with in-memory fakes in the `fakes` module.

pub mod classify;
pub mod eligibility;
pub mod envelope;
pub mod error;
pub mod fakes;
pub mod identity;
pub mod normalize;
pub mod profile;
pub mod record;
pub mod source;

// Re-export key types
pub use classify::{Classifier, EngineOutput};
pub use eligibility::{EligibilityConfig, IncludePath, Rule};
pub use envelope::{Envelope, SchemaVersion};
pub use error::{TriageError, TriageResult};
pub use identity::{derive, new_incident, new_issue, Culprit, Derivation, Incident, Issue};
pub use normalize::{normalize, Finding, Normalized, ProposedStatus};
pub use profile::{IncidentIdField, KindPolicy, Profile};
pub use record::{CiResult, ResultKind};
pub use source::ResultSource;
