//! # Scan Error Taxonomy
//!
//! @title Error Kinds for the Analysis Pipeline
//! @author Ramprasad
//!
//! Centralizes the error kinds raised across ingest, parsing, graph
//! construction, detection, and scoring so the driver can report a single
//! tagged error (or capture a non-fatal one into the run report) instead of
//! letting each stage invent its own ad hoc failure type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Taxonomy of errors the scan pipeline can surface.
///
/// Most variants are non-fatal: [`ScanError::ParseWarning`] and
/// [`ScanError::DetectorError`] are captured into the run report and never
/// halt a scan (§7). [`ScanError::GraphInvariantViolation`] is the one
/// fatal kind and surfaces as a terminal error carrying the offending node
/// id. [`ScanError::GradeViolation`] is declared for completeness of the
/// taxonomy but is never constructed: the severity cap in [`crate::grade`]
/// is total over all four grades, so there is no code path that produces
/// an ungraded finding.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The repository root does not exist, is not readable, or contains
    /// no Rust source files under any detected program directory.
    #[error("repository ingest failed for '{path}': {reason}")]
    IngestError { path: String, reason: String },

    /// A single file failed to parse. Non-fatal: the file is skipped and
    /// the scan proceeds (§4.2 "Failure semantics").
    #[error("parse warning in '{file}': {message}")]
    ParseWarning { file: String, message: String },

    /// The Fact Graph violated one of its structural invariants (§3,
    /// Invariants 1-2, 5-6). This indicates a bug in the parser or graph
    /// builder, not a malformed input program, and halts the scan.
    #[error("fact graph invariant violated at node '{node_id}': {detail}")]
    GraphInvariantViolation { node_id: String, detail: String },

    /// A class detector (§4.5) panicked or returned an internal error.
    /// Non-fatal: the detector is skipped and the failure is logged into
    /// the run report.
    #[error("detector '{detector_id}' failed: {detail}")]
    DetectorError { detector_id: String, detail: String },

    /// An `ExpectedFinding` in a golden suite file references a repo id
    /// that is not present in the suite, or a `GoldenRepo` fails the
    /// fail-fast reachability check at ingest time (§6).
    #[error("scorer config error: {0}")]
    ScorerConfigError(String),

    /// Never raised. The Trust Grade filter (§4.6) is a total function
    /// from evidence to `{A, B, C, D}`; there is no input for which grade
    /// assignment is undefined. Kept in the taxonomy so callers matching
    /// on `ScanError` exhaustively are reminded the policy is total, not
    /// because any code path constructs it.
    #[error("grade policy violation (unreachable): {0}")]
    GradeViolation(String),
}

/// Warnings and detector failures accumulated during a scan, captured
/// rather than propagated (§7 "Policy").
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub parse_warnings: Vec<String>,
    pub detector_failures: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_parse_warning(&mut self, file: &str, message: impl std::fmt::Display) {
        self.parse_warnings.push(format!("{file}: {message}"));
    }

    pub fn push_detector_failure(&mut self, detector_id: &str, detail: impl std::fmt::Display) {
        self.detector_failures
            .push(format!("{detector_id}: {detail}"));
    }

    pub fn is_clean(&self) -> bool {
        self.parse_warnings.is_empty() && self.detector_failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_accumulate_without_failing() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_clean());
        diag.push_parse_warning("a.rs", "unexpected token");
        diag.push_detector_failure("V099", "index out of bounds");
        assert!(!diag.is_clean());
        assert_eq!(diag.parse_warnings.len(), 1);
        assert_eq!(diag.detector_failures.len(), 1);
    }
}
