//! # Report Builder (C8)
//!
//! @title Evidence Chains, Graph Artifacts, and Program Summary
//! @author Ramprasad
//!
//! Turns a list of [`GradedFinding`]s plus the [`FactGraph`] they were
//! raised against into everything an operator or CI job consumes: a
//! five-part evidence chain per finding (§4.8), four graph artifacts
//! derived from the Fact Graph, a `ProgramSummary` with the `shipReady`
//! verdict, and the Finding JSON schema (§6) rendered as terminal,
//! Markdown, JSON, and GitHub Actions annotation output. This module is
//! the teacher's `formatter`/`print_terminal`/`to_markdown` machinery,
//! generalized from a flat `Finding` list to the richer shapes this
//! pipeline produces.

mod finding;

pub use finding::Severity;

use crate::candidates::VulnClass;
use crate::grade::{ActionableFinding, Grade, GradedFinding};
use crate::graph::{FactGraph, GuardKind, SinkKind};
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Part 1 of an evidence chain: what is being claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub class: String,
    pub title: String,
}

/// Part 2: the sensitive sink the claim is anchored to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveSink {
    pub kind: String,
    pub file: String,
    pub line: usize,
    pub end_line: usize,
    pub impact: String,
}

/// Part 3: the attacker-controlled inputs that reach the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackerControl {
    pub source_accounts: Vec<String>,
    pub taint_description: String,
    pub taint_path: Option<Vec<String>>,
}

/// Part 4: the guard that should exist but does not (or is insufficient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingGuardProof {
    pub expected_guard_kind: String,
    pub locations_searched: Vec<String>,
    pub guards_found_insufficient: Vec<String>,
    pub absence_statement: String,
}

/// One step of an exploit's bypass path, optionally pinned to a graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassStep {
    pub description: String,
    pub node_ref: Option<String>,
}

/// Part 5: the ordered steps an attacker would take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassPath {
    pub steps: Vec<BypassStep>,
}

/// The five-part evidence chain for a single finding (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceChain {
    pub fingerprint: String,
    pub claim: Claim,
    pub sensitive_sink: Option<SensitiveSink>,
    pub attacker_control: AttackerControl,
    pub missing_guard: MissingGuardProof,
    pub bypass_path: BypassPath,
}

/// A node in a [`GraphArtifact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub metadata: Option<HashMap<String, String>>,
}

/// An edge in a [`GraphArtifact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub metadata: Option<HashMap<String, String>>,
}

/// `{name, nodes, edges}` (§6 "Graph artifact format").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphArtifact {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Program-level rollup: counts per severity plus the ship/no-ship verdict
/// (§4.8 "shipReady true iff no CRITICAL and no HIGH findings remain").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
    pub ship_ready: bool,
}

impl ProgramSummary {
    pub fn from_findings(findings: &[ActionableFinding]) -> Self {
        let mut summary = ProgramSummary {
            critical: 0,
            high: 0,
            medium: 0,
            low: 0,
            info: 0,
            total: findings.len(),
            ship_ready: true,
        };

        for finding in findings {
            match finding.enforced_severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary.ship_ready = summary.critical == 0 && summary.high == 0;
        summary
    }
}

/// A location within the Finding JSON schema (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingLocation {
    pub file: String,
    pub line: usize,
    pub end_line: usize,
    pub instruction: Option<String>,
}

/// The Finding JSON schema of §6, rendered verbatim:
/// `{id, class, className, severity, title, location, confidence,
/// hypothesis, proofStatus, proofPlan?, fixPlan?, blastRadius?, grade}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingRecord {
    pub id: String,
    pub class: String,
    pub class_name: String,
    pub severity: Severity,
    pub title: String,
    pub location: FindingLocation,
    pub confidence: f32,
    pub hypothesis: String,
    pub proof_status: String,
    pub proof_plan: Option<String>,
    pub fix_plan: Option<String>,
    pub blast_radius: Option<String>,
    pub grade: String,
}

/// The full scan report returned by [`crate::driver::run_scan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub program: Option<String>,
    pub findings: Vec<FindingRecord>,
    pub evidence_chains: Vec<EvidenceChain>,
    pub graphs: Vec<GraphArtifact>,
    pub summary: ProgramSummary,
    pub diagnostics: crate::error::Diagnostics,
}

fn sink_kind_label(kind: SinkKind) -> &'static str {
    match kind {
        SinkKind::TokenTransfer => "token_transfer",
        SinkKind::SolTransfer => "sol_transfer",
        SinkKind::TokenMintTo => "token_mint_to",
        SinkKind::TokenBurn => "token_burn",
        SinkKind::TokenApprove => "token_approve",
        SinkKind::TokenRevoke => "token_revoke",
        SinkKind::SetAuthority => "set_authority",
        SinkKind::CloseAccount => "close_account",
        SinkKind::SystemTransfer => "system_transfer",
        SinkKind::LamportMutation => "lamport_mutation",
        SinkKind::Invoke => "invoke",
        SinkKind::InvokeSigned => "invoke_signed",
        SinkKind::AccountClose => "account_close",
        SinkKind::AccountRealloc => "account_realloc",
        SinkKind::SysvarInstructionsRead => "sysvar_instructions_read",
        SinkKind::StateWrite => "state_write",
        SinkKind::OracleRead => "oracle_read",
    }
}

fn guard_kind_label(kind: &GuardKind) -> String {
    match kind {
        GuardKind::Constraint(c) => format!("constraint({c:?})"),
        GuardKind::Require(e) => format!("require!({e})"),
        GuardKind::Assert(e) => format!("assert!({e})"),
        GuardKind::IfCondition(e) => format!("if {e}"),
    }
}

/// Builds the five-part evidence chain for one graded finding (§4.8).
///
/// Reads the candidate's linked sink and instruction off `graph` directly
/// rather than re-deriving anything from source text: the candidate
/// already carries everything not itself queryable on the graph.
pub fn build_evidence_chain(graph: &FactGraph, graded: &GradedFinding) -> EvidenceChain {
    let candidate = &graded.finding.candidate;

    let sensitive_sink = candidate.sink_id.as_ref().and_then(|id| graph.sinks.get(id)).map(|sink| {
        SensitiveSink {
            kind: sink_kind_label(sink.kind).to_string(),
            file: sink.span.file.clone(),
            line: sink.span.start_line,
            end_line: sink.span.end_line,
            impact: format!(
                "reaches a {} sink with no confirmed guard in front of it",
                sink_kind_label(sink.kind)
            ),
        }
    });

    let source_accounts: Vec<String> =
        candidate.involved_accounts.iter().map(|a| a.name.clone()).collect();

    let guards_on_instruction: Vec<String> = graph
        .instructions
        .get(&candidate.instruction)
        .map(|instr| {
            instr
                .guard_ids
                .iter()
                .filter_map(|id| graph.guards.get(id))
                .map(|g| guard_kind_label(&g.kind))
                .collect()
        })
        .unwrap_or_default();

    let expected_guard_kind = match candidate.vuln_class {
        VulnClass::MissingSigner => "signer",
        VulnClass::MissingOwner => "owner",
        VulnClass::PdaBumpMisuse => "canonical_bump",
        VulnClass::ArbitraryCpi => "program_id_check",
        VulnClass::TypeConfusion => "discriminator_check",
        VulnClass::Reinitialization => "is_initialized_check",
        VulnClass::CloseWithoutZero => "signer",
        VulnClass::UncheckedRealloc => "zero_flag",
        VulnClass::IntegerOverflow => "checked_arithmetic",
        VulnClass::StateMachineViolation => "state_precondition_check",
        VulnClass::UnvalidatedRemainingAccounts => "length_and_owner_check",
        VulnClass::OracleValidation => "staleness_check",
        VulnClass::TokenAuthorityMismatch => "authority_constraint",
        VulnClass::StalePostCpi => "reload",
        VulnClass::AccountAliasing => "distinguishing_constraint",
    };

    let absence_statement = format!(
        "no {} guard found on instruction '{}'",
        expected_guard_kind,
        candidate.instruction.as_str()
    );

    EvidenceChain {
        fingerprint: candidate.fingerprint.clone(),
        claim: Claim { class: candidate.vuln_class.as_str().to_string(), title: candidate.vuln_class.title().to_string() },
        sensitive_sink,
        attacker_control: AttackerControl {
            source_accounts,
            taint_description: candidate.reason.clone(),
            taint_path: None,
        },
        missing_guard: MissingGuardProof {
            expected_guard_kind: expected_guard_kind.to_string(),
            locations_searched: vec![candidate.instruction.as_str().to_string()],
            guards_found_insufficient: guards_on_instruction,
            absence_statement,
        },
        bypass_path: BypassPath {
            steps: vec![
                BypassStep {
                    description: format!(
                        "invoke instruction '{}' substituting an attacker-controlled account for the missing guard target",
                        candidate.instruction.as_str()
                    ),
                    node_ref: Some(candidate.instruction.as_str().to_string()),
                },
                BypassStep {
                    description: "observe the sink execute without the expected guard having fired".to_string(),
                    node_ref: candidate.sink_id.as_ref().map(|s| s.as_str().to_string()),
                },
            ],
        },
    }
}

/// Builds the four graph artifacts of §4.8 from the Fact Graph: authority
/// flow (signers to mutations), token flow (sources to transfer CPI to
/// destinations), state machine (variants to transitions), and PDA graph
/// (seeds to PDAs to instructions).
pub fn build_graph_artifacts(graph: &FactGraph) -> Vec<GraphArtifact> {
    vec![
        authority_flow_artifact(graph),
        token_flow_artifact(graph),
        state_machine_artifact(graph),
        pda_graph_artifact(graph),
    ]
}

fn authority_flow_artifact(graph: &FactGraph) -> GraphArtifact {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for instr_id in &graph.instruction_order {
        let Some(instr) = graph.instructions.get(instr_id) else { continue };
        nodes.push(GraphNode {
            id: instr_id.as_str().to_string(),
            label: instr.name.clone(),
            node_type: "instruction".to_string(),
            metadata: None,
        });

        for signer in &instr.required_signers {
            let signer_id = format!("signer::{signer}");
            nodes.push(GraphNode {
                id: signer_id.clone(),
                label: signer.clone(),
                node_type: "signer".to_string(),
                metadata: None,
            });
            edges.push(GraphEdge {
                source: signer_id,
                target: instr_id.as_str().to_string(),
                label: "authorizes".to_string(),
                metadata: None,
            });
        }

        for sink_id in &instr.sink_ids {
            if let Some(sink) = graph.sinks.get(sink_id) {
                edges.push(GraphEdge {
                    source: instr_id.as_str().to_string(),
                    target: sink_id.as_str().to_string(),
                    label: "mutates_via".to_string(),
                    metadata: None,
                });
                nodes.push(GraphNode {
                    id: sink_id.as_str().to_string(),
                    label: sink_kind_label(sink.kind).to_string(),
                    node_type: "sink".to_string(),
                    metadata: None,
                });
            }
        }
    }

    GraphArtifact { name: "authority-flow".to_string(), nodes, edges }
}

fn token_flow_artifact(graph: &FactGraph) -> GraphArtifact {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for (sink_id, sink) in &graph.sinks {
        if !matches!(sink.kind, SinkKind::TokenTransfer | SinkKind::TokenMintTo | SinkKind::TokenBurn) {
            continue;
        }
        nodes.push(GraphNode {
            id: sink_id.as_str().to_string(),
            label: sink_kind_label(sink.kind).to_string(),
            node_type: "transfer_cpi".to_string(),
            metadata: None,
        });

        for (i, account) in sink.accounts.iter().enumerate() {
            let account_node_id = format!("{}::{}", sink_id.as_str(), account);
            nodes.push(GraphNode {
                id: account_node_id.clone(),
                label: account.clone(),
                node_type: "account".to_string(),
                metadata: None,
            });
            let label = if i == 0 { "source" } else { "destination" };
            edges.push(GraphEdge {
                source: account_node_id,
                target: sink_id.as_str().to_string(),
                label: label.to_string(),
                metadata: None,
            });
        }
    }

    GraphArtifact { name: "token-flow".to_string(), nodes, edges }
}

fn state_machine_artifact(graph: &FactGraph) -> GraphArtifact {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for sink_id in graph.sinks.values().filter(|s| s.kind == SinkKind::StateWrite).map(|s| s.id.clone()) {
        let Some(sink) = graph.sinks.get(&sink_id) else { continue };
        let instr_label = sink.instruction.as_str().to_string();
        nodes.push(GraphNode {
            id: instr_label.clone(),
            label: instr_label.clone(),
            node_type: "transition".to_string(),
            metadata: None,
        });
        nodes.push(GraphNode {
            id: sink_id.as_str().to_string(),
            label: "state_write".to_string(),
            node_type: "state".to_string(),
            metadata: None,
        });
        edges.push(GraphEdge {
            source: instr_label,
            target: sink_id.as_str().to_string(),
            label: "writes".to_string(),
            metadata: None,
        });
    }

    GraphArtifact { name: "state-machine".to_string(), nodes, edges }
}

fn pda_graph_artifact(graph: &FactGraph) -> GraphArtifact {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut seed_signatures: HashMap<String, Vec<String>> = HashMap::new();

    for (pda_id, pda) in &graph.pdas {
        let seed_sig = pda.seeds.iter().map(|s| s.text.clone()).collect::<Vec<_>>().join(",");
        nodes.push(GraphNode {
            id: pda_id.as_str().to_string(),
            label: seed_sig.clone(),
            node_type: "pda".to_string(),
            metadata: None,
        });
        edges.push(GraphEdge {
            source: seed_sig.clone(),
            target: pda_id.as_str().to_string(),
            label: "derives".to_string(),
            metadata: None,
        });
        edges.push(GraphEdge {
            source: pda_id.as_str().to_string(),
            target: pda.instruction.as_str().to_string(),
            label: "used_by".to_string(),
            metadata: None,
        });
        seed_signatures.entry(seed_sig).or_default().push(pda_id.as_str().to_string());
    }

    for (seed_sig, pda_ids) in &seed_signatures {
        nodes.push(GraphNode {
            id: seed_sig.clone(),
            label: seed_sig.clone(),
            node_type: "seed".to_string(),
            metadata: None,
        });
        if pda_ids.len() > 1 {
            let collision_id = format!("collision::{seed_sig}");
            nodes.push(GraphNode {
                id: collision_id.clone(),
                label: format!("{} PDAs share these seeds", pda_ids.len()),
                node_type: "collision".to_string(),
                metadata: None,
            });
            for pda_id in pda_ids {
                edges.push(GraphEdge {
                    source: pda_id.clone(),
                    target: collision_id.clone(),
                    label: "collides_with".to_string(),
                    metadata: None,
                });
            }
        }
    }

    GraphArtifact { name: "pda-graph".to_string(), nodes, edges }
}

/// Renders one [`ActionableFinding`] into the Finding JSON schema of §6,
/// attaching the optional proof/fix plan text from
/// [`crate::poc_generator`] when supplied.
pub fn to_finding_record(
    finding: &ActionableFinding,
    proof_plan: Option<String>,
    fix_plan: Option<String>,
) -> FindingRecord {
    let proof_status = match finding.status {
        crate::grade::FindingStatus::Proven => "proven",
        crate::grade::FindingStatus::Confirmed => "confirmed",
        crate::grade::FindingStatus::Likely => "likely",
        crate::grade::FindingStatus::Rejected => "rejected",
    };

    FindingRecord {
        id: finding.fingerprint.clone(),
        class: finding.vuln_class.as_str().to_string(),
        class_name: finding.vuln_class.title().to_string(),
        severity: finding.enforced_severity,
        title: finding.title.clone(),
        location: FindingLocation {
            file: finding.file.clone(),
            line: finding.line,
            end_line: finding.end_line,
            instruction: Some(finding.instruction.clone()),
        },
        confidence: finding.confidence,
        hypothesis: finding.reason.clone(),
        proof_status: proof_status.to_string(),
        proof_plan,
        fix_plan,
        blast_radius: None,
        grade: match finding.grade {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
        .to_string(),
    }
}

impl ScanReport {
    /// Prints colorized output to the terminal, teacher's `print_terminal` style.
    pub fn print_terminal(&self) {
        if self.findings.is_empty() {
            println!("\n{}", "[+] No vulnerabilities found.".green().bold());
            return;
        }

        println!("\n{}", "[!] Security Findings:".red().bold());
        println!("{}", "=".repeat(60).cyan());

        for (i, finding) in self.findings.iter().enumerate() {
            print_finding_terminal(finding, i + 1);
        }
    }

    /// Prints summary statistics to the terminal, teacher's `print_summary` style.
    pub fn print_summary(&self) {
        println!(
            "{}",
            format!(
                "[*] Summary: {} Critical | {} High | {} Medium | {} Low | {} Info",
                self.summary.critical, self.summary.high, self.summary.medium, self.summary.low, self.summary.info
            )
            .bold()
        );

        let verdict = if self.summary.ship_ready {
            "[+] Ship ready: no CRITICAL or HIGH findings remain.".green().bold()
        } else {
            "[!] Not ship ready: CRITICAL or HIGH findings remain.".red().bold()
        };
        println!("{verdict}");
    }

    /// Renders the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Sentinel Scan Report\n\n");
        if let Some(program) = &self.program {
            out.push_str(&format!("**Program:** {program}\n\n"));
        }
        out.push_str(&format!(
            "**Summary:** {} Critical | {} High | {} Medium | {} Low | {} Info — ship ready: {}\n\n",
            self.summary.critical,
            self.summary.high,
            self.summary.medium,
            self.summary.low,
            self.summary.info,
            self.summary.ship_ready
        ));

        for finding in &self.findings {
            out.push_str(&format!(
                "## [{}] {} ({})\n\n- **Class:** {}\n- **Grade:** {}\n- **Location:** {}:{}\n- **Confidence:** {:.2}\n- **Hypothesis:** {}\n",
                finding.severity.to_string().to_uppercase(),
                finding.title,
                finding.id,
                finding.class_name,
                finding.grade,
                finding.location.file,
                finding.location.line,
                finding.confidence,
                finding.hypothesis,
            ));
            if let Some(plan) = &finding.proof_plan {
                out.push_str(&format!("- **Proof plan:** {plan}\n"));
            }
            if let Some(plan) = &finding.fix_plan {
                out.push_str(&format!("- **Fix plan:** {plan}\n"));
            }
            out.push('\n');
        }

        out
    }

    /// Renders the report as JSON, matching the Finding JSON schema verbatim.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Renders findings as GitHub Actions `::error`/`::warning` annotations,
    /// kept from the teacher's CI integration verbatim.
    pub fn to_github_annotations(&self) -> String {
        let mut out = String::new();
        for finding in &self.findings {
            let level = match finding.severity {
                Severity::Critical | Severity::High => "error",
                Severity::Medium => "warning",
                Severity::Low | Severity::Info => "notice",
            };
            out.push_str(&format!(
                "::{} file={},line={}::[{}] {}\n",
                level, finding.location.file, finding.location.line, finding.class_name, finding.title
            ));
        }
        out
    }
}

fn print_finding_terminal(finding: &FindingRecord, index: usize) {
    println!();
    println!(
        "{} {} [{}] {}",
        format!("#{}", index).cyan().bold(),
        severity_colored_label(finding.severity),
        finding.class.yellow(),
        finding.title.white().bold()
    );

    println!(
        "   {} {}:{}",
        "Location:".dimmed(),
        finding.location.file.blue(),
        finding.location.line.to_string().cyan()
    );

    println!("   {}", finding.hypothesis.dimmed());
    println!("   {} {}", "Grade:".dimmed(), finding.grade.cyan());

    if let Some(plan) = &finding.fix_plan {
        println!("\n   {}", "Fix plan:".green());
        for line in plan.lines().take(3) {
            println!("   {}", line.green().dimmed());
        }
    }

    println!("{}", "-".repeat(60).dimmed());
}

fn severity_colored_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".white().on_red().bold(),
        Severity::High => "HIGH".black().on_yellow().bold(),
        Severity::Medium => "MEDIUM".white().on_bright_blue().bold(),
        Severity::Low => "LOW".black().on_white().bold(),
        Severity::Info => "INFO".black().on_bright_white(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::FindingStatus;

    fn sample_finding(severity: Severity) -> ActionableFinding {
        ActionableFinding {
            vuln_class: VulnClass::MissingSigner,
            grade: Grade::C,
            enforced_severity: severity,
            instruction: "lib.rs::withdraw".to_string(),
            instruction_aliases: None,
            file: "lib.rs".to_string(),
            line: 10,
            end_line: 12,
            account_names: vec!["authority".to_string()],
            confidence: 0.8,
            status: FindingStatus::Likely,
            title: "Missing Signer Check".to_string(),
            reason: "authority not signer-checked".to_string(),
            fingerprint: "fp-1".to_string(),
        }
    }

    #[test]
    fn summary_ship_ready_false_with_critical() {
        let findings = vec![sample_finding(Severity::Critical)];
        let summary = ProgramSummary::from_findings(&findings);
        assert_eq!(summary.critical, 1);
        assert!(!summary.ship_ready);
    }

    #[test]
    fn summary_ship_ready_true_with_only_medium() {
        let findings = vec![sample_finding(Severity::Medium)];
        let summary = ProgramSummary::from_findings(&findings);
        assert!(summary.ship_ready);
    }

    #[test]
    fn finding_record_carries_grade_and_class() {
        let finding = sample_finding(Severity::High);
        let record = to_finding_record(&finding, None, None);
        assert_eq!(record.class, "missing_signer");
        assert_eq!(record.grade, "C");
    }
}
