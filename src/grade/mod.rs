//! # Trust Grade Filter (C6)
//!
//! @title Evidence-Weighted Grading and Severity Cap Enforcement
//! @author Ramprasad
//!
//! Assigns each [`VulnCandidate`] a grade in `{A, B, C, D}` from the
//! evidence attached to it — a proven PoC, a confident LLM confirmation,
//! structural evidence, or nothing — and enforces a severity cap per
//! grade (§4.6). The cap is total: every candidate reaches exactly one
//! of the four grades, so [`crate::error::ScanError::GradeViolation`] is
//! never constructed.

use crate::candidates::VulnCandidate;
use crate::collaborators::{LlmConfirmation, LlmVerdict, PocOutcome, PocStatus};
use crate::report::Severity;
use serde::{Deserialize, Serialize};

/// `none < uncertain < confirmed < proven` (§4.6 ambient monotonicity
/// note): an ordered enum so "upgrading confirmation never lowers
/// grade" is a total-order comparison, mirroring how
/// [`crate::report::Severity`] derives `Ord` instead of hand-rolled
/// `if` chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfirmationLevel {
    None,
    Uncertain,
    Confirmed,
    Proven,
}

/// `{LIKELY, CONFIRMED, PROVEN, REJECTED}` (§3 "Finding").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingStatus {
    Likely,
    Confirmed,
    Proven,
    Rejected,
}

/// `VulnCandidate + status + optional LLM confirmation + optional PoC
/// result` (§3 "Finding").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub candidate: VulnCandidate,
    pub status: FindingStatus,
    pub llm_confirmation: Option<LlmConfirmation>,
    pub poc_result: Option<PocOutcome>,
}

/// The four trust grades (§4.6 "Grades").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    D,
    C,
    B,
    A,
}

impl Grade {
    /// `{A:CRITICAL, B:CRITICAL, C:HIGH, D:MEDIUM}` (§4.6 "Severity caps").
    pub fn severity_cap(&self) -> Severity {
        match self {
            Grade::A => Severity::Critical,
            Grade::B => Severity::Critical,
            Grade::C => Severity::High,
            Grade::D => Severity::Medium,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

/// `Finding` wrapped with `{grade, gradeReason, originalSeverity,
/// enforcedSeverity, wasDowngraded}` (§3 "GradedFinding").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedFinding {
    pub finding: Finding,
    pub grade: Grade,
    pub grade_reason: String,
    pub original_severity: Severity,
    pub enforced_severity: Severity,
    pub was_downgraded: bool,
}

/// `{vulnClass, enforcedSeverity, instruction, file, accountNames,
/// confidence, status, title, instructionAliases?}` (§3 "ActionableFinding").
///
/// Carries a few extra fields beyond the minimal spec list
/// (`grade`, `line`, `end_line`, `reason`, `sink_kind`, `fingerprint`)
/// that the report builder (§4.8) needs to render evidence chains and
/// graph artifacts without re-querying the graded finding it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionableFinding {
    pub vuln_class: crate::candidates::VulnClass,
    pub grade: Grade,
    pub enforced_severity: Severity,
    pub instruction: String,
    pub instruction_aliases: Option<Vec<String>>,
    pub file: String,
    pub line: usize,
    pub end_line: usize,
    pub account_names: Vec<String>,
    pub confidence: f32,
    pub status: FindingStatus,
    pub title: String,
    pub reason: String,
    pub fingerprint: String,
}

fn confirmation_level(finding: &Finding) -> ConfirmationLevel {
    if matches!(&finding.poc_result, Some(PocOutcome { status: PocStatus::Proven, .. })) {
        return ConfirmationLevel::Proven;
    }
    match &finding.llm_confirmation {
        Some(LlmConfirmation { verdict: LlmVerdict::Confirmed, confidence, .. }) if *confidence >= 80 => {
            ConfirmationLevel::Confirmed
        }
        Some(LlmConfirmation { verdict: LlmVerdict::Uncertain, confidence, .. }) if *confidence >= 50 => {
            ConfirmationLevel::Uncertain
        }
        _ => ConfirmationLevel::None,
    }
}

/// `>= 1` of: named involved accounts; linked sink id; accounts struct
/// analyzed (implied by named accounts); narrow span `<= 20` lines;
/// produced by a class detector (§4.6 "Grade C").
fn has_structural_evidence(candidate: &VulnCandidate) -> bool {
    !candidate.involved_accounts.is_empty()
        || candidate.sink_id.is_some()
        || candidate.span.len_lines() <= 20
        || matches!(candidate.source, crate::candidates::CandidateSource::ClassDetector(_))
}

/// Assigns a grade and a one-line reason (§4.6).
fn assign_grade(finding: &Finding) -> (Grade, String) {
    let level = confirmation_level(finding);
    if level == ConfirmationLevel::Proven {
        return (Grade::A, "PoC collaborator returned a proven verdict".to_string());
    }

    let structural = has_structural_evidence(&finding.candidate);
    if level == ConfirmationLevel::Confirmed && structural {
        return (
            Grade::B,
            "LLM confirmation >= 80% confidence backed by structural evidence".to_string(),
        );
    }

    if structural {
        return (Grade::C, "structural evidence present on the candidate".to_string());
    }
    if level == ConfirmationLevel::Uncertain {
        return (Grade::C, "LLM uncertain verdict >= 50% confidence".to_string());
    }

    (Grade::D, "no structural evidence and no qualifying external confirmation".to_string())
}

/// Grades one candidate and enforces the severity cap, returning `None`
/// when the enforced severity falls below MEDIUM — such findings are
/// excluded from the actionable set (§4.6 "Output").
pub fn grade_finding(finding: Finding) -> GradedFinding {
    let (grade, grade_reason) = assign_grade(&finding);
    let original_severity = finding.candidate.severity;
    let cap = grade.severity_cap();
    let enforced_severity = original_severity.min(cap);
    let was_downgraded = enforced_severity < original_severity;

    GradedFinding {
        finding,
        grade,
        grade_reason,
        original_severity,
        enforced_severity,
        was_downgraded,
    }
}

/// Grades every candidate, producing [`GradedFinding`]s in the same
/// order (§4.6).
pub fn grade_candidates(
    candidates: Vec<VulnCandidate>,
    llm: Option<&dyn crate::collaborators::LlmCollaborator>,
    poc: Option<&dyn crate::collaborators::PocCollaborator>,
    program_name: Option<&str>,
) -> Vec<GradedFinding> {
    candidates
        .into_iter()
        .map(|candidate| {
            let llm_confirmation = llm.and_then(|c| {
                c.confirm(crate::collaborators::LlmRequest { candidate: &candidate, excerpt: &candidate.excerpt })
            });
            let poc_result = poc.and_then(|c| {
                c.prove(crate::collaborators::PocRequest { candidate: &candidate, program_name })
            });

            let status = if matches!(&poc_result, Some(PocOutcome { status: PocStatus::Proven, .. })) {
                FindingStatus::Proven
            } else if matches!(&poc_result, Some(PocOutcome { status: PocStatus::Disproven, .. })) {
                FindingStatus::Rejected
            } else if matches!(
                &llm_confirmation,
                Some(LlmConfirmation { verdict: LlmVerdict::Confirmed, .. })
            ) {
                FindingStatus::Confirmed
            } else if matches!(
                &llm_confirmation,
                Some(LlmConfirmation { verdict: LlmVerdict::Rejected, .. })
            ) {
                FindingStatus::Rejected
            } else {
                FindingStatus::Likely
            };

            let finding = Finding { candidate, status, llm_confirmation, poc_result };
            grade_finding(finding)
        })
        .collect()
}

/// Filters and flattens [`GradedFinding`]s into the report/scorer input
/// shape, dropping anything whose enforced severity falls below MEDIUM
/// (§4.6 "Output").
pub fn to_actionable(
    graded: &[GradedFinding],
    instruction_aliases: impl Fn(&str) -> Option<Vec<String>>,
) -> Vec<ActionableFinding> {
    graded
        .iter()
        .filter(|g| g.enforced_severity >= Severity::Medium)
        .map(|g| {
            let candidate = &g.finding.candidate;
            ActionableFinding {
                vuln_class: candidate.vuln_class,
                grade: g.grade,
                enforced_severity: g.enforced_severity,
                instruction: candidate.instruction.as_str().to_string(),
                instruction_aliases: instruction_aliases(candidate.instruction.as_str()),
                file: candidate.span.file.clone(),
                line: candidate.span.start_line,
                end_line: candidate.span.end_line,
                account_names: candidate.involved_accounts.iter().map(|a| a.name.clone()).collect(),
                confidence: candidate.confidence,
                status: g.finding.status,
                title: candidate.vuln_class.title().to_string(),
                reason: candidate.reason.clone(),
                fingerprint: candidate.fingerprint.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::{CandidateSource, VulnClass};
    use crate::graph::{AstSpan, StableId};

    fn base_candidate() -> VulnCandidate {
        VulnCandidate {
            id: "VC-0001".to_string(),
            vuln_class: VulnClass::MissingSigner,
            severity: Severity::Critical,
            confidence: 0.7,
            instruction: StableId::instruction("lib.rs", "withdraw"),
            span: AstSpan::line("lib.rs", 10),
            involved_accounts: Vec::new(),
            reason: "no signer check".to_string(),
            sink_id: None,
            fingerprint: "fp".to_string(),
            excerpt: String::new(),
            source: CandidateSource::Generator,
        }
    }

    #[test]
    fn no_evidence_grades_d_and_caps_to_medium() {
        let finding = Finding { candidate: base_candidate(), status: FindingStatus::Likely, llm_confirmation: None, poc_result: None };
        let graded = grade_finding(finding);
        assert_eq!(graded.grade, Grade::D);
        assert_eq!(graded.enforced_severity, Severity::Medium);
        assert!(graded.was_downgraded);
    }

    #[test]
    fn structural_evidence_grades_c_and_caps_to_high() {
        let mut candidate = base_candidate();
        candidate.sink_id = Some(StableId::sink("lib.rs", "withdraw", "TokenTransfer", 12));
        let finding = Finding { candidate, status: FindingStatus::Likely, llm_confirmation: None, poc_result: None };
        let graded = grade_finding(finding);
        assert_eq!(graded.grade, Grade::C);
        assert_eq!(graded.enforced_severity, Severity::High);
    }

    #[test]
    fn proven_poc_grades_a_and_preserves_critical() {
        let candidate = base_candidate();
        let finding = Finding {
            candidate,
            status: FindingStatus::Proven,
            llm_confirmation: None,
            poc_result: Some(PocOutcome { status: PocStatus::Proven, logs: None, pre_state: None, post_state: None }),
        };
        let graded = grade_finding(finding);
        assert_eq!(graded.grade, Grade::A);
        assert_eq!(graded.enforced_severity, Severity::Critical);
        assert!(!graded.was_downgraded);
    }

    #[test]
    fn sub_medium_enforced_severity_is_excluded_from_actionable_set() {
        let mut candidate = base_candidate();
        candidate.severity = Severity::Low;
        let finding = Finding { candidate, status: FindingStatus::Likely, llm_confirmation: None, poc_result: None };
        let graded = vec![grade_finding(finding)];
        let actionable = to_actionable(&graded, |_| None);
        assert!(actionable.is_empty());
    }

    #[test]
    fn confirmation_level_is_monotone() {
        assert!(ConfirmationLevel::Uncertain > ConfirmationLevel::None);
        assert!(ConfirmationLevel::Confirmed > ConfirmationLevel::Uncertain);
        assert!(ConfirmationLevel::Proven > ConfirmationLevel::Confirmed);
    }
}
