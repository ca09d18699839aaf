//! # Candidate Generator (C4)
//!
//! @title Sink-First Structural Candidate Generation
//! @author Ramprasad
//!
//! Consumes the [`FactGraph`](crate::graph::FactGraph) built by the parser
//! and produces a deduplicated, severity-sorted list of [`VulnCandidate`]s
//! (§4.4). Purely structural: every rule here is a query over precomputed
//! sink neighborhoods, account constraints, and body excerpts already
//! captured on graph nodes — never a re-parse of source text.
//!
//! The closed set of 15 vulnerability classes lives in [`VulnClass`]; the
//! legacy per-class detectors under [`crate::detectors`] informed these
//! rules (see `DESIGN.md` for the grounding ledger) and have since been
//! folded into this single sink-first pass plus the three gap-filling
//! detectors in [`crate::class_detectors`].

mod rules;

pub use rules::generate;

use crate::graph::{AstSpan, StableId};
use crate::report::Severity;
use serde::{Deserialize, Serialize};

/// The closed set of vulnerability classes this system audits (§1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VulnClass {
    MissingSigner,
    MissingOwner,
    PdaBumpMisuse,
    ArbitraryCpi,
    TypeConfusion,
    Reinitialization,
    CloseWithoutZero,
    UncheckedRealloc,
    IntegerOverflow,
    StateMachineViolation,
    UnvalidatedRemainingAccounts,
    OracleValidation,
    TokenAuthorityMismatch,
    StalePostCpi,
    AccountAliasing,
}

impl VulnClass {
    /// Stable lowercase/underscore tag used in fingerprints, scorer
    /// criteria, and JSON output (spec.md's `vulnClass` strings).
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnClass::MissingSigner => "missing_signer",
            VulnClass::MissingOwner => "missing_owner",
            VulnClass::PdaBumpMisuse => "pda_derivation",
            VulnClass::ArbitraryCpi => "arbitrary_cpi",
            VulnClass::TypeConfusion => "type_confusion",
            VulnClass::Reinitialization => "reinit",
            VulnClass::CloseWithoutZero => "close_revive",
            VulnClass::UncheckedRealloc => "unchecked_realloc",
            VulnClass::IntegerOverflow => "integer_overflow",
            VulnClass::StateMachineViolation => "state_machine_violation",
            VulnClass::UnvalidatedRemainingAccounts => "unvalidated_remaining_accounts",
            VulnClass::OracleValidation => "oracle_validation",
            VulnClass::TokenAuthorityMismatch => "token_authority_mismatch",
            VulnClass::StalePostCpi => "stale_post_cpi",
            VulnClass::AccountAliasing => "account_aliasing",
        }
    }

    /// Human title-cased name for report titles.
    pub fn title(&self) -> &'static str {
        match self {
            VulnClass::MissingSigner => "Missing Signer Check",
            VulnClass::MissingOwner => "Missing Owner Validation",
            VulnClass::PdaBumpMisuse => "PDA Bump Misuse",
            VulnClass::ArbitraryCpi => "Arbitrary CPI",
            VulnClass::TypeConfusion => "Account Type Confusion",
            VulnClass::Reinitialization => "Re-initialization",
            VulnClass::CloseWithoutZero => "Close Without Zeroing",
            VulnClass::UncheckedRealloc => "Unchecked Realloc",
            VulnClass::IntegerOverflow => "Integer Overflow",
            VulnClass::StateMachineViolation => "State-Machine Violation",
            VulnClass::UnvalidatedRemainingAccounts => "Unvalidated Remaining Accounts",
            VulnClass::OracleValidation => "Oracle Validation Gap",
            VulnClass::TokenAuthorityMismatch => "Token Authority/Mint Mismatch",
            VulnClass::StalePostCpi => "Stale Post-CPI Read",
            VulnClass::AccountAliasing => "Account Aliasing",
        }
    }
}

/// Where a [`VulnCandidate`] originated. Grade C's "produced by a class
/// detector" criterion (§4.6) reads this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    Generator,
    ClassDetector(&'static str),
}

/// An account name plus the constraint kinds carried on it, as recorded
/// on a candidate (§3 "VulnCandidate" `involvedAccounts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvolvedAccount {
    pub name: String,
    pub constraints: Vec<String>,
}

/// A candidate vulnerability produced by the generator or a class
/// detector, before trust-grade filtering (§3 "VulnCandidate").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnCandidate {
    pub id: String,
    pub vuln_class: VulnClass,
    pub severity: Severity,
    pub confidence: f32,
    pub instruction: StableId,
    pub span: AstSpan,
    pub involved_accounts: Vec<InvolvedAccount>,
    pub reason: String,
    pub sink_id: Option<StableId>,
    pub fingerprint: String,
    pub excerpt: String,
    pub source: CandidateSource,
}

impl VulnCandidate {
    /// `"{class}:{instruction}:{file}:{startLine}:{sortedAccountNames}"` (§3).
    pub fn compute_fingerprint(
        class: VulnClass,
        instruction_name: &str,
        file: &str,
        start_line: usize,
        account_names: &[String],
    ) -> String {
        let mut names = account_names.to_vec();
        names.sort();
        names.dedup();
        format!(
            "{}:{}:{}:{}:{}",
            class.as_str(),
            instruction_name,
            file,
            start_line,
            names.join(",")
        )
    }

    fn severity_weight(&self) -> u32 {
        match self.severity {
            Severity::Critical => 100,
            Severity::High => 75,
            Severity::Medium => 50,
            Severity::Low => 25,
            Severity::Info => 10,
        }
    }

    pub fn priority(&self) -> f32 {
        self.severity_weight() as f32 * self.confidence
    }
}

/// Deduplicates candidates by fingerprint (higher confidence wins ties),
/// sorts by `severityWeight * confidence` descending, and renumbers IDs
/// (§4.4 "Dedup & ordering"). Shared between the generator's own output
/// and the merge of generator + class-detector candidates (§4.5 closing
/// paragraph).
pub fn dedup_and_sort(candidates: Vec<VulnCandidate>) -> Vec<VulnCandidate> {
    use std::collections::HashMap;

    let mut by_fingerprint: HashMap<String, VulnCandidate> = HashMap::new();
    for candidate in candidates {
        match by_fingerprint.get(&candidate.fingerprint) {
            Some(existing) if existing.confidence >= candidate.confidence => {}
            _ => {
                by_fingerprint.insert(candidate.fingerprint.clone(), candidate);
            }
        }
    }

    let mut sorted: Vec<VulnCandidate> = by_fingerprint.into_values().collect();
    sorted.sort_by(|a, b| {
        b.priority()
            .partial_cmp(&a.priority())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });

    for (i, candidate) in sorted.iter_mut().enumerate() {
        candidate.id = format!("VC-{:04}", i + 1);
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_account_order_independent() {
        let a = VulnCandidate::compute_fingerprint(
            VulnClass::MissingSigner,
            "withdraw",
            "lib.rs",
            10,
            &["authority".to_string(), "vault".to_string()],
        );
        let b = VulnCandidate::compute_fingerprint(
            VulnClass::MissingSigner,
            "withdraw",
            "lib.rs",
            10,
            &["vault".to_string(), "authority".to_string()],
        );
        assert_eq!(a, b);
    }

    fn candidate(fingerprint: &str, confidence: f32, severity: Severity) -> VulnCandidate {
        VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::MissingSigner,
            severity,
            confidence,
            instruction: StableId::instruction("lib.rs", "withdraw"),
            span: AstSpan::line("lib.rs", 1),
            involved_accounts: Vec::new(),
            reason: "test".to_string(),
            sink_id: None,
            fingerprint: fingerprint.to_string(),
            excerpt: String::new(),
            source: CandidateSource::Generator,
        }
    }

    #[test]
    fn dedup_keeps_highest_confidence_per_fingerprint() {
        let candidates = vec![
            candidate("fp-1", 0.5, Severity::High),
            candidate("fp-1", 0.9, Severity::High),
            candidate("fp-2", 0.3, Severity::Low),
        ];
        let deduped = dedup_and_sort(candidates);
        assert_eq!(deduped.len(), 2);
        let fp1 = deduped.iter().find(|c| c.fingerprint == "fp-1").unwrap();
        assert_eq!(fp1.confidence, 0.9);
    }

    #[test]
    fn sort_orders_by_severity_weight_times_confidence() {
        let candidates = vec![
            candidate("fp-low", 0.9, Severity::Low),
            candidate("fp-critical", 0.5, Severity::Critical),
        ];
        let sorted = dedup_and_sort(candidates);
        assert_eq!(sorted[0].fingerprint, "fp-critical");
        assert_eq!(sorted[0].id, "VC-0001");
    }
}
