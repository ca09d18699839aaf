//! # Scorer (C7)
//!
//! @title Golden-Suite Matching and Precision/Recall/F1 Evaluation
//! @author Ramprasad
//!
//! Scores a repo's [`crate::grade::ActionableFinding`]s against a
//! [`GoldenRepo`] descriptor: a weighted matching score picks the best
//! actual finding for each expected one, unmatched expectations become
//! false negatives, unmatched actuals at MEDIUM+ become false
//! positives, and traps catch findings that land on a known
//! false-positive hot spot (§4.7). Reachability of each golden repo's
//! source is checked through [`RepoReachability`] so a malformed suite
//! fails fast at ingest rather than silently scoring zero repos.

use crate::candidates::VulnClass;
use crate::grade::ActionableFinding;
use crate::report::Severity;
use serde::{Deserialize, Serialize};

/// `{vulnClass, altVulnClasses?, instructions[], accountNames?, file?, minSeverity?}`
/// (§4.7 "GoldenRepo").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub vuln_class: VulnClass,
    #[serde(default)]
    pub alt_vuln_classes: Vec<VulnClass>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub account_names: Vec<String>,
    pub file: Option<String>,
    pub min_severity: Option<Severity>,
}

/// A single expected finding within a [`GoldenRepo`] (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedFinding {
    pub id: String,
    pub criteria: MatchCriteria,
    pub description: String,
}

/// `{likelyFalseClass, location:{file?, instruction?}, description}` (§4.7 "Traps").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalsePositiveTrap {
    pub likely_false_class: VulnClass,
    pub file: Option<String>,
    pub instruction: Option<String>,
    pub description: String,
}

/// `{id, repoUrl, branch, programDir, framework, expectedFindings[],
/// falsePositiveTraps[]}` (§4.7 "GoldenRepo").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenRepo {
    pub id: String,
    pub repo_url: String,
    pub branch: String,
    pub program_dir: String,
    pub framework: String,
    pub expected_findings: Vec<ExpectedFinding>,
    pub false_positive_traps: Vec<FalsePositiveTrap>,
}

/// Verifies a golden repo's source is reachable before it is scored
/// (§4.7 ambient "Golden suite reachability"). Implementations outside
/// tests perform an HTTP HEAD/GET; test code injects a stub that always
/// reports reachable so unit tests never touch the network.
pub trait RepoReachability {
    fn is_reachable(&self, repo_url: &str, branch: &str) -> bool;
}

/// Default implementation backed by a blocking `reqwest` client,
/// enriched from the sibling example repos' HTTP-fetch pattern since
/// this crate otherwise has no HTTP client at all.
pub struct HttpRepoReachability {
    client: reqwest::blocking::Client,
}

impl HttpRepoReachability {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static configuration"),
        }
    }
}

impl Default for HttpRepoReachability {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoReachability for HttpRepoReachability {
    fn is_reachable(&self, repo_url: &str, _branch: &str) -> bool {
        self.client
            .head(repo_url)
            .send()
            .map(|resp| resp.status().is_success() || resp.status().is_redirection())
            .unwrap_or(false)
    }
}

/// Validates every [`GoldenRepo`] in a suite against `reachability`,
/// returning the first unreachable repo as an error (§4.7, §7
/// "ScorerConfigError").
pub fn validate_suite(
    suite: &[GoldenRepo],
    reachability: &dyn RepoReachability,
) -> Result<(), crate::error::ScanError> {
    for repo in suite {
        if !reachability.is_reachable(&repo.repo_url, &repo.branch) {
            return Err(crate::error::ScanError::ScorerConfigError(format!(
                "golden repo '{}' is unreachable at {} (branch {})",
                repo.id, repo.repo_url, repo.branch
            )));
        }
    }
    Ok(())
}

fn severity_rank(s: Severity) -> u8 {
    match s {
        Severity::Critical => 4,
        Severity::High => 3,
        Severity::Medium => 2,
        Severity::Low => 1,
        Severity::Info => 0,
    }
}

fn instruction_matches(finding: &ActionableFinding, expected_instructions: &[String]) -> bool {
    let candidates: Vec<String> = std::iter::once(finding.instruction.clone())
        .chain(finding.instruction_aliases.iter().flatten().cloned())
        .map(|s| s.to_lowercase())
        .collect();

    expected_instructions.iter().any(|expected| {
        let expected_lower = expected.to_lowercase();
        candidates
            .iter()
            .any(|c| c.contains(&expected_lower) || expected_lower.contains(c.as_str()))
    })
}

fn account_overlap_fraction(finding: &ActionableFinding, expected_accounts: &[String]) -> f32 {
    if expected_accounts.is_empty() {
        return 0.0;
    }
    let matched = expected_accounts
        .iter()
        .filter(|expected| {
            finding
                .account_names
                .iter()
                .any(|actual| actual.to_lowercase().contains(&expected.to_lowercase()))
        })
        .count();
    matched as f32 / expected_accounts.len() as f32
}

/// Computes the weighted matching score for one (expected, actual)
/// pair, or `None` when a hard filter (class, instruction) fails (§4.7
/// "Matching score").
fn matching_score(expected: &MatchCriteria, actual: &ActionableFinding) -> Option<f32> {
    let class_weight = if actual.vuln_class == expected.vuln_class {
        0.40
    } else if expected.alt_vuln_classes.contains(&actual.vuln_class) {
        0.30
    } else {
        return None;
    };

    if !instruction_matches(actual, &expected.instructions) {
        return None;
    }
    let instruction_weight = 0.30;

    let account_weight = 0.15 * account_overlap_fraction(actual, &expected.account_names);

    let file_weight = match &expected.file {
        Some(file) if actual.file.contains(file.as_str()) || file.contains(actual.file.as_str()) => 0.10,
        Some(_) => 0.0,
        None => 0.0,
    };

    let severity_weight = match expected.min_severity {
        Some(min) if severity_rank(actual.enforced_severity) >= severity_rank(min) => 0.05,
        Some(_) => 0.0,
        None => 0.05,
    };

    let mut max_applicable = 0.40 + 0.30;
    if !expected.account_names.is_empty() {
        max_applicable += 0.15;
    }
    if expected.file.is_some() {
        max_applicable += 0.10;
    }
    max_applicable += 0.05;

    let total = class_weight + instruction_weight + account_weight + file_weight + severity_weight;
    Some(total / max_applicable)
}

const MATCH_THRESHOLD: f32 = 0.60;

/// One matched (expected, actual) pair above [`MATCH_THRESHOLD`], or an
/// unmatched expected/actual record.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    TruePositive { expected_id: String, actual_index: usize, score: f32 },
    FalseNegative { expected_id: String },
    FalsePositive { actual_index: usize },
}

/// Greedy assignment: each expected finding claims its highest-scoring
/// unmatched actual finding above threshold (§4.7 "Assignment").
pub fn assign(expected: &[ExpectedFinding], actual: &[ActionableFinding]) -> Vec<MatchOutcome> {
    let mut claimed = vec![false; actual.len()];
    let mut outcomes = Vec::new();

    for expectation in expected {
        let best = actual
            .iter()
            .enumerate()
            .filter(|(i, _)| !claimed[*i])
            .filter_map(|(i, finding)| matching_score(&expectation.criteria, finding).map(|score| (i, score)))
            .filter(|(_, score)| *score > MATCH_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((idx, score)) => {
                claimed[idx] = true;
                outcomes.push(MatchOutcome::TruePositive { expected_id: expectation.id.clone(), actual_index: idx, score });
            }
            None => outcomes.push(MatchOutcome::FalseNegative { expected_id: expectation.id.clone() }),
        }
    }

    for (idx, finding) in actual.iter().enumerate() {
        if !claimed[idx] && severity_rank(finding.enforced_severity) >= severity_rank(Severity::Medium) {
            outcomes.push(MatchOutcome::FalsePositive { actual_index: idx });
        }
    }

    outcomes
}

/// Precision/recall/F1 over one repo, plus per-class breakdown (§4.7
/// "Metrics").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

impl Metrics {
    pub fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = if tp + fp == 0 { 0.0 } else { tp as f32 / (tp + fp) as f32 };
        let recall = if tp + fn_ == 0 { 0.0 } else { tp as f32 / (tp + fn_) as f32 };
        let f1 = if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) };
        Self { true_positives: tp, false_positives: fp, false_negatives: fn_, precision, recall, f1 }
    }
}

/// A trap violation: an actual finding landed on a location the suite
/// author expects to be a false positive (§4.7 "Traps").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapViolation {
    pub trap_description: String,
    pub actual_index: usize,
}

fn trap_triggered(trap: &FalsePositiveTrap, finding: &ActionableFinding) -> bool {
    if finding.vuln_class != trap.likely_false_class {
        return false;
    }
    if !matches!(finding.enforced_severity, Severity::Critical | Severity::High) {
        return false;
    }
    let file_matches = trap.file.as_ref().map_or(true, |f| finding.file.contains(f.as_str()));
    let instruction_matches = trap
        .instruction
        .as_ref()
        .map_or(true, |i| finding.instruction.to_lowercase().contains(&i.to_lowercase()));
    file_matches && instruction_matches
}

/// Full per-repo scoring result (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoScore {
    pub repo_id: String,
    pub metrics: Metrics,
    pub per_class: std::collections::HashMap<String, Metrics>,
    pub trap_violations: Vec<TrapViolation>,
}

/// Scores one repo's actionable findings against its golden descriptor
/// (§4.7).
pub fn score_repo(repo: &GoldenRepo, actual: &[ActionableFinding]) -> RepoScore {
    let outcomes = assign(&repo.expected_findings, actual);

    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;
    let mut per_class: std::collections::HashMap<String, (usize, usize, usize)> = std::collections::HashMap::new();

    for outcome in &outcomes {
        match outcome {
            MatchOutcome::TruePositive { expected_id, actual_index, .. } => {
                tp += 1;
                let class = actual[*actual_index].vuln_class.as_str().to_string();
                per_class.entry(class).or_default().0 += 1;
                let _ = expected_id;
            }
            MatchOutcome::FalseNegative { expected_id } => {
                fn_ += 1;
                if let Some(expected) = repo.expected_findings.iter().find(|e| &e.id == expected_id) {
                    let class = expected.criteria.vuln_class.as_str().to_string();
                    per_class.entry(class).or_default().2 += 1;
                }
            }
            MatchOutcome::FalsePositive { actual_index } => {
                fp += 1;
                let class = actual[*actual_index].vuln_class.as_str().to_string();
                per_class.entry(class).or_default().1 += 1;
            }
        }
    }

    let trap_violations = repo
        .false_positive_traps
        .iter()
        .flat_map(|trap| {
            actual
                .iter()
                .enumerate()
                .filter(|(_, finding)| trap_triggered(trap, finding))
                .map(|(idx, _)| TrapViolation { trap_description: trap.description.clone(), actual_index: idx })
                .collect::<Vec<_>>()
        })
        .collect();

    RepoScore {
        repo_id: repo.id.clone(),
        metrics: Metrics::from_counts(tp, fp, fn_),
        per_class: per_class
            .into_iter()
            .map(|(class, (tp, fp, fn_))| (class, Metrics::from_counts(tp, fp, fn_)))
            .collect(),
        trap_violations,
    }
}

/// Suite-wide micro-averaged aggregation: sums TP/FP/FN across repos
/// and recomputes precision/recall/F1 on the totals (§4.7 "Suite aggregation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteScore {
    pub repo_scores: Vec<RepoScore>,
    pub micro_average: Metrics,
    pub per_class: std::collections::HashMap<String, Metrics>,
}

pub fn score_suite(repo_scores: Vec<RepoScore>) -> SuiteScore {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;
    let mut per_class: std::collections::HashMap<String, (usize, usize, usize)> = std::collections::HashMap::new();

    for repo in &repo_scores {
        tp += repo.metrics.true_positives;
        fp += repo.metrics.false_positives;
        fn_ += repo.metrics.false_negatives;
        for (class, metrics) in &repo.per_class {
            let entry = per_class.entry(class.clone()).or_default();
            entry.0 += metrics.true_positives;
            entry.1 += metrics.false_positives;
            entry.2 += metrics.false_negatives;
        }
    }

    SuiteScore {
        micro_average: Metrics::from_counts(tp, fp, fn_),
        per_class: per_class
            .into_iter()
            .map(|(class, (tp, fp, fn_))| (class, Metrics::from_counts(tp, fp, fn_)))
            .collect(),
        repo_scores,
    }
}

/// Non-zero-exit regression policy for `sentinel eval compare` (§6
/// ambient "Evaluation CLI"): a drop of >= 5 percentage points on
/// suite-wide precision, recall, or F1, or any per-repo F1 drop >= 10
/// percentage points, is a regression.
pub fn is_regression(baseline: &SuiteScore, current: &SuiteScore) -> bool {
    let pp_drop = |base: f32, cur: f32| (base - cur) * 100.0 >= 5.0;
    if pp_drop(baseline.micro_average.precision, current.micro_average.precision)
        || pp_drop(baseline.micro_average.recall, current.micro_average.recall)
        || pp_drop(baseline.micro_average.f1, current.micro_average.f1)
    {
        return true;
    }

    for baseline_repo in &baseline.repo_scores {
        let Some(current_repo) = current.repo_scores.iter().find(|r| r.repo_id == baseline_repo.repo_id) else {
            continue;
        };
        if (baseline_repo.metrics.f1 - current_repo.metrics.f1) * 100.0 >= 10.0 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::{FindingStatus, Grade};

    struct AlwaysReachable;
    impl RepoReachability for AlwaysReachable {
        fn is_reachable(&self, _repo_url: &str, _branch: &str) -> bool {
            true
        }
    }

    fn finding(instruction: &str, vuln_class: VulnClass, severity: Severity, accounts: &[&str]) -> ActionableFinding {
        ActionableFinding {
            vuln_class,
            grade: Grade::C,
            enforced_severity: severity,
            instruction: format!("lib.rs::{instruction}"),
            instruction_aliases: None,
            file: "lib.rs".to_string(),
            line: 10,
            end_line: 10,
            account_names: accounts.iter().map(|s| s.to_string()).collect(),
            confidence: 0.7,
            status: FindingStatus::Likely,
            title: "Missing Signer Check".to_string(),
            reason: "test".to_string(),
            fingerprint: "fp".to_string(),
        }
    }

    fn expectation(id: &str, instruction: &str, vuln_class: VulnClass) -> ExpectedFinding {
        ExpectedFinding {
            id: id.to_string(),
            criteria: MatchCriteria {
                vuln_class,
                alt_vuln_classes: Vec::new(),
                instructions: vec![instruction.to_string()],
                account_names: Vec::new(),
                file: None,
                min_severity: None,
            },
            description: "expected".to_string(),
        }
    }

    #[test]
    fn exact_class_and_instruction_match_scores_above_threshold() {
        let actual = finding("withdraw", VulnClass::MissingSigner, Severity::Critical, &["authority"]);
        let expected = expectation("E-1", "withdraw", VulnClass::MissingSigner);
        let score = matching_score(&expected.criteria, &actual).unwrap();
        assert!(score > MATCH_THRESHOLD, "score {score} should exceed threshold");
    }

    #[test]
    fn mismatched_class_is_hard_filtered() {
        let actual = finding("withdraw", VulnClass::IntegerOverflow, Severity::Critical, &[]);
        let expected = expectation("E-1", "withdraw", VulnClass::MissingSigner);
        assert!(matching_score(&expected.criteria, &actual).is_none());
    }

    #[test]
    fn assignment_produces_tp_fn_fp() {
        let actual = vec![
            finding("withdraw", VulnClass::MissingSigner, Severity::Critical, &["authority"]),
            finding("deposit", VulnClass::IntegerOverflow, Severity::High, &[]),
        ];
        let expected = vec![
            expectation("E-1", "withdraw", VulnClass::MissingSigner),
            expectation("E-2", "close", VulnClass::AccountAliasing),
        ];
        let outcomes = assign(&expected, &actual);
        let tp = outcomes.iter().filter(|o| matches!(o, MatchOutcome::TruePositive { .. })).count();
        let fn_ = outcomes.iter().filter(|o| matches!(o, MatchOutcome::FalseNegative { .. })).count();
        let fp = outcomes.iter().filter(|o| matches!(o, MatchOutcome::FalsePositive { .. })).count();
        assert_eq!(tp, 1);
        assert_eq!(fn_, 1);
        assert_eq!(fp, 1);
    }

    #[test]
    fn metrics_handle_zero_denominators() {
        let metrics = Metrics::from_counts(0, 0, 0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn suite_compare_flags_five_point_precision_regression() {
        let baseline = score_suite(vec![RepoScore {
            repo_id: "r1".to_string(),
            metrics: Metrics::from_counts(9, 1, 0),
            per_class: std::collections::HashMap::new(),
            trap_violations: Vec::new(),
        }]);
        let current = score_suite(vec![RepoScore {
            repo_id: "r1".to_string(),
            metrics: Metrics::from_counts(7, 3, 0),
            per_class: std::collections::HashMap::new(),
            trap_violations: Vec::new(),
        }]);
        assert!(is_regression(&baseline, &current));
    }

    #[test]
    fn reachability_stub_passes_validation() {
        let suite = vec![GoldenRepo {
            id: "r1".to_string(),
            repo_url: "https://github.com/example/repo".to_string(),
            branch: "main".to_string(),
            program_dir: "programs/example".to_string(),
            framework: "anchor".to_string(),
            expected_findings: Vec::new(),
            false_positive_traps: Vec::new(),
        }];
        assert!(validate_suite(&suite, &AlwaysReachable).is_ok());
    }
}
