//! # Scan Driver
//!
//! @title `runScan` Orchestration
//! @author Ramprasad
//!
//! Wires the seven stages of §6 together: ingest, build the Fact Graph,
//! run the candidate generator, run the class detectors, optionally
//! confirm via an external LLM, grade, and build the report. This is the
//! one place that owns the full pipeline end to end; every stage below
//! it (`ingest`, `graph`, `candidates`, `class_detectors`, `grade`,
//! `report`) is a pure function over its inputs with no knowledge of the
//! others.

use crate::candidates::{self, dedup_and_sort};
use crate::class_detectors;
use crate::collaborators::{LlmCollaborator, PocCollaborator};
use crate::error::{Diagnostics, ScanError};
use crate::grade::{self, ActionableFinding, GradedFinding};
use crate::graph::{self, FactGraph};
use crate::ingest;
use crate::report::{self, EvidenceChain, GraphArtifact, ProgramSummary, ScanReport};
use std::path::Path;

/// The mode a scan runs under (§6 "Driver entry").
///
/// `Scan` never invokes the optional LLM collaborator (§4.6 "confirm is
/// skipped in SCAN"). `Prove`/`FixPlan` both run the confirm stage;
/// `FixPlan` additionally asks the PoC-scaffold generator (§4.8
/// "supplement") to attach a `fixPlan` string to every finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Scan,
    Prove,
    FixPlan,
}

/// Input to [`run_scan`] (§6 "Driver entry").
pub struct ScanRequest<'a> {
    pub repo_path: std::path::PathBuf,
    pub mode: ScanMode,
    pub program_dir_hint: Option<std::path::PathBuf>,
    pub llm: Option<&'a dyn LlmCollaborator>,
    pub poc: Option<&'a dyn PocCollaborator>,
    /// `onProgress(stageName, percent)` (§5). Returning `Err` aborts the
    /// scan between stages — this *is* "throwing out of the progress
    /// callback" (§5 "Cancellation").
    pub on_progress: Option<Box<dyn FnMut(&str, u8) -> Result<(), ScanError> + 'a>>,
}

impl<'a> ScanRequest<'a> {
    pub fn new(repo_path: impl Into<std::path::PathBuf>, mode: ScanMode) -> Self {
        Self { repo_path: repo_path.into(), mode, program_dir_hint: None, llm: None, poc: None, on_progress: None }
    }
}

fn report_progress(
    on_progress: &mut Option<Box<dyn FnMut(&str, u8) -> Result<(), ScanError> + '_>>,
    stage: &str,
    percent: u8,
) -> Result<(), ScanError> {
    if let Some(cb) = on_progress.as_mut() {
        cb(stage, percent)?;
    }
    Ok(())
}

fn instruction_aliases_fn(graph: &FactGraph) -> impl Fn(&str) -> Option<Vec<String>> + '_ {
    move |instruction_id: &str| {
        let fn_name = instruction_id.rsplit("::").next().unwrap_or(instruction_id);
        let aliases: Vec<String> = graph
            .native_dispatch_aliases
            .iter()
            .filter(|(callee, _)| callee.as_str() == fn_name)
            .map(|(_, variant)| variant.clone())
            .collect();
        if aliases.is_empty() {
            None
        } else {
            Some(aliases)
        }
    }
}

/// Runs a full scan over `request.repo_path` (§6 "Driver entry").
///
/// Stages and their progress ranges, exactly as §6 lists them:
/// `parse:5→15`, `build_graph:15→30`, `candidates:30→45`,
/// `detectors:45→55`, `confirm:55→70` (skipped in `Scan`),
/// `grade:70→80`, `report:80→100`.
pub fn run_scan(mut request: ScanRequest<'_>) -> Result<ScanReport, ScanError> {
    let mut on_progress = request.on_progress.take();
    let mut diagnostics = Diagnostics::new();

    report_progress(&mut on_progress, "parse", 5)?;
    let files = ingest::collect_source_files(&request.repo_path, request.program_dir_hint.as_deref())?;
    report_progress(&mut on_progress, "parse", 15)?;

    report_progress(&mut on_progress, "build_graph", 15)?;
    let fact_graph = graph::build(&files, &mut diagnostics);
    report_progress(&mut on_progress, "build_graph", 30)?;

    report_progress(&mut on_progress, "candidates", 30)?;
    let generated = candidates::generate(&fact_graph);
    report_progress(&mut on_progress, "candidates", 45)?;

    report_progress(&mut on_progress, "detectors", 45)?;
    let detected = run_class_detectors(&fact_graph, &mut diagnostics);
    report_progress(&mut on_progress, "detectors", 55)?;

    let merged = dedup_and_sort(generated.into_iter().chain(detected).collect());

    report_progress(&mut on_progress, "confirm", 55)?;
    let llm = if request.mode == ScanMode::Scan { None } else { request.llm };
    report_progress(&mut on_progress, "confirm", 70)?;

    report_progress(&mut on_progress, "grade", 70)?;
    let program_name = fact_graph.program.as_ref().and_then(|p| p.name.as_deref());
    let graded = grade::grade_candidates(merged, llm, request.poc, program_name);
    report_progress(&mut on_progress, "grade", 80)?;

    report_progress(&mut on_progress, "report", 80)?;
    let scan_report = build_report(&fact_graph, &graded, request.mode, &diagnostics, program_name);
    report_progress(&mut on_progress, "report", 100)?;

    Ok(scan_report)
}

fn run_class_detectors(graph: &FactGraph, diagnostics: &mut Diagnostics) -> Vec<crate::candidates::VulnCandidate> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| class_detectors::run_all(graph)));
    match result {
        Ok(candidates) => candidates,
        Err(_) => {
            diagnostics.push_detector_failure("class_detectors::run_all", "detector pass panicked, skipped");
            Vec::new()
        }
    }
}

fn build_report(
    graph: &FactGraph,
    graded: &[GradedFinding],
    mode: ScanMode,
    diagnostics: &Diagnostics,
    program_name: Option<&str>,
) -> ScanReport {
    let aliases = instruction_aliases_fn(graph);
    let actionable: Vec<ActionableFinding> = grade::to_actionable(graded, aliases);

    let evidence_chains: Vec<EvidenceChain> =
        graded.iter().map(|g| report::build_evidence_chain(graph, g)).collect();

    let plans_enabled = mode != ScanMode::Scan;
    let findings = actionable
        .iter()
        .map(|finding| {
            let (proof_plan, fix_plan) = if plans_enabled {
                (
                    Some(crate::poc_generator::proof_plan_for(finding)),
                    Some(crate::poc_generator::fix_plan_for(finding)),
                )
            } else {
                (None, None)
            };
            report::to_finding_record(finding, proof_plan, fix_plan)
        })
        .collect();

    let graphs: Vec<GraphArtifact> = report::build_graph_artifacts(graph);
    let summary = ProgramSummary::from_findings(&actionable);

    ScanReport {
        program: program_name.map(|s| s.to_string()),
        findings,
        evidence_chains,
        graphs,
        summary,
        diagnostics: diagnostics.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_program(dir: &TempDir, body: &str) {
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[dependencies]\nanchor-lang = \"0.29\"\n").unwrap();
        fs::write(src.join("lib.rs"), body).unwrap();
    }

    #[test]
    fn empty_repo_yields_zero_findings_and_ship_ready() {
        let dir = TempDir::new().unwrap();
        write_program(
            &dir,
            r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod empty_prog {
                use super::*;
            }
            "#,
        );

        let request = ScanRequest::new(dir.path().to_path_buf(), ScanMode::Scan);
        let report = run_scan(request).unwrap();
        assert_eq!(report.findings.len(), 0);
        assert!(report.summary.ship_ready);
    }

    #[test]
    fn progress_callback_can_abort_the_scan() {
        let dir = TempDir::new().unwrap();
        write_program(&dir, "pub fn noop() {}");

        let mut request = ScanRequest::new(dir.path().to_path_buf(), ScanMode::Scan);
        request.on_progress = Some(Box::new(|stage, _percent| {
            if stage == "build_graph" {
                return Err(ScanError::IngestError {
                    path: "aborted".to_string(),
                    reason: "caller requested cancellation".to_string(),
                });
            }
            Ok(())
        }));

        let result = run_scan(request);
        assert!(result.is_err());
    }

    #[test]
    fn missing_repo_path_is_an_ingest_error() {
        let request = ScanRequest::new("/nonexistent/path/for/sentinel-tests", ScanMode::Scan);
        let result = run_scan(request);
        assert!(matches!(result, Err(ScanError::IngestError { .. })));
    }
}
