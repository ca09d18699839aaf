//! # External Collaborators
//!
//! @title Optional LLM Confirmation and PoC Execution Seams
//! @author Ramprasad
//!
//! The core analysis pipeline never requires a network call or a
//! language model: both collaborator traits are optional (§6), and the
//! grader tolerates their absence entirely — no calls made, no grade-B
//! upgrades, no grade-A upgrades. Implementations live outside this
//! crate; callers pass a `Box<dyn LlmCollaborator>`/`Box<dyn
//! PocCollaborator>` into [`crate::driver::ScanRequest`] when they want
//! the richer grading those seams unlock.

use crate::candidates::VulnCandidate;
use serde::{Deserialize, Serialize};

/// An external LLM's verdict on a single candidate (§6 "Optional LLM
/// collaborator").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmVerdict {
    Confirmed,
    Uncertain,
    Rejected,
}

/// `{verdict, confidence in [0,100], title?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfirmation {
    pub verdict: LlmVerdict,
    pub confidence: u8,
    pub title: Option<String>,
}

/// Input to an [`LlmCollaborator`] call: the candidate plus the
/// surrounding source excerpt it was found in.
pub struct LlmRequest<'a> {
    pub candidate: &'a VulnCandidate,
    pub excerpt: &'a str,
}

/// External reasoning collaborator that can confirm or reject a
/// candidate beyond what structural evidence alone supports (§6).
/// `mode: Scan` never calls this trait (§4.6 "confirm" is skipped in
/// `SCAN`); only `Prove`/`FixPlan` invoke it.
pub trait LlmCollaborator {
    fn confirm(&self, request: LlmRequest<'_>) -> Option<LlmConfirmation>;
}

/// An external PoC execution's outcome (§6 "Optional PoC collaborator").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PocStatus {
    Proven,
    Disproven,
    Error,
}

/// `{status, logs?, preState?, postState?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocOutcome {
    pub status: PocStatus,
    pub logs: Option<String>,
    pub pre_state: Option<String>,
    pub post_state: Option<String>,
}

/// Input to a [`PocCollaborator`] call: the finding under proof plus the
/// program's on-chain address/name, if known.
pub struct PocRequest<'a> {
    pub candidate: &'a VulnCandidate,
    pub program_name: Option<&'a str>,
}

/// External proof-of-concept execution collaborator. A `proven` result
/// upgrades a finding straight to grade A regardless of what evidence
/// preceded it (§6, §4.6).
pub trait PocCollaborator {
    fn prove(&self, request: PocRequest<'_>) -> Option<PocOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::{CandidateSource, VulnClass};
    use crate::graph::{AstSpan, StableId};
    use crate::report::Severity;

    struct AlwaysUncertain;
    impl LlmCollaborator for AlwaysUncertain {
        fn confirm(&self, _request: LlmRequest<'_>) -> Option<LlmConfirmation> {
            Some(LlmConfirmation { verdict: LlmVerdict::Uncertain, confidence: 55, title: None })
        }
    }

    fn candidate() -> VulnCandidate {
        VulnCandidate {
            id: "VC-0001".to_string(),
            vuln_class: VulnClass::MissingSigner,
            severity: Severity::Critical,
            confidence: 0.7,
            instruction: StableId::instruction("lib.rs", "withdraw"),
            span: AstSpan::line("lib.rs", 10),
            involved_accounts: Vec::new(),
            reason: "test".to_string(),
            sink_id: None,
            fingerprint: "fp".to_string(),
            excerpt: String::new(),
            source: CandidateSource::Generator,
        }
    }

    #[test]
    fn llm_collaborator_is_an_optional_trait_object() {
        let candidate = candidate();
        let collaborator: Box<dyn LlmCollaborator> = Box::new(AlwaysUncertain);
        let verdict = collaborator.confirm(LlmRequest { candidate: &candidate, excerpt: "" });
        assert!(matches!(verdict, Some(LlmConfirmation { verdict: LlmVerdict::Uncertain, .. })));
    }
}
