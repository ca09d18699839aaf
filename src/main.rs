//! # Sentinel CLI Entry Point
//!
//! @title Sentinel CLI
//! @author Ramprasad
//!
//! Main entry point for the Sentinel command-line security scanner:
//! dispatches to `scan`/`diff`/`init`/`list`/`version` and the golden-suite
//! `eval` subcommand tree.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use sentinel_core::candidates::VulnClass;
use sentinel_core::cli::{Cli, Commands, EvalCommands};
use sentinel_core::driver::{run_scan, ScanMode, ScanRequest};
use sentinel_core::report::{ScanReport, Severity};
use sentinel_core::scorer::{self, GoldenRepo, HttpRepoReachability, SuiteScore};
use std::path::PathBuf;

/// ASCII art banner displayed at startup.
const BANNER: &str = r#"
  ____             _   _            _
 / ___|  ___ _ __ | |_(_)_ __   ___| |
 \___ \ / _ \ '_ \| __| | '_ \ / _ \ |
  ___) |  __/ | | | |_| | | | |  __/ |
 |____/ \___|_| |_|\__|_|_| |_|\___|_|

      Solana Smart Contract Security Scanner
"#;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("{}", BANNER.cyan().bold());

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { path, mode, format, emit_poc_scaffold, output, severity } => {
            run_scan_command(path, mode, format, emit_poc_scaffold, output, severity)?;
        }
        Commands::List => list_vuln_classes(),
        Commands::Version => {
            println!("{} {}", "Sentinel version:".green(), env!("CARGO_PKG_VERSION").yellow());
        }
        Commands::Diff { old_path, new_path } => run_diff(old_path, new_path)?,
        Commands::Init => run_init()?,
        Commands::Eval { command } => run_eval(command)?,
    }

    Ok(())
}

fn parse_mode(mode: &str) -> ScanMode {
    match mode {
        "prove" => ScanMode::Prove,
        "fix-plan" | "fix_plan" => ScanMode::FixPlan,
        _ => ScanMode::Scan,
    }
}

fn run_scan_command(
    path: PathBuf,
    mode: String,
    format: String,
    emit_poc_scaffold: bool,
    output: Option<PathBuf>,
    min_severity: Option<String>,
) -> Result<()> {
    println!("{} {}", "[*] Scanning:".green().bold(), path.display().to_string().yellow());

    let scan_mode = parse_mode(&mode);
    let mut request = ScanRequest::new(path.clone(), scan_mode);
    request.on_progress = Some(Box::new(|stage, percent| {
        log::debug!("stage '{stage}' reached {percent}%");
        Ok(())
    }));

    let mut report = run_scan(request).context("scan failed")?;

    if let Some(min_sev) = min_severity.as_deref() {
        let floor = Severity::from_str(min_sev);
        report.findings.retain(|f| f.severity >= floor);
    }

    render_report(&report, &format, output.as_deref())?;

    if emit_poc_scaffold {
        let poc_output = output.clone().unwrap_or_else(|| PathBuf::from("./exploits"));
        let actionable = actionable_from_records(&report);
        let written = sentinel_core::poc_generator::write_poc_scaffold(
            &actionable,
            &poc_output,
            report.program.as_deref(),
        )?;
        println!("\n{}", "[+] Generated POC scaffold:".magenta().bold());
        for file in written {
            println!("    -> {}", file.display().to_string().yellow());
        }
    }

    println!("\n{}", "=".repeat(60).cyan());
    report.print_summary();

    Ok(())
}

/// Reconstructs an `ActionableFinding` list from a report's
/// `FindingRecord`s, accounts left empty: the scaffold only needs
/// instruction/file/line/title out of each.
fn actionable_from_records(report: &ScanReport) -> Vec<sentinel_core::grade::ActionableFinding> {
    report
        .findings
        .iter()
        .map(|f| sentinel_core::grade::ActionableFinding {
            vuln_class: vuln_class_from_str(&f.class),
            grade: sentinel_core::grade::Grade::C,
            enforced_severity: f.severity,
            instruction: f.location.instruction.clone().unwrap_or_default(),
            instruction_aliases: None,
            file: f.location.file.clone(),
            line: f.location.line,
            end_line: f.location.end_line,
            account_names: Vec::new(),
            confidence: f.confidence,
            status: sentinel_core::grade::FindingStatus::Likely,
            title: f.title.clone(),
            reason: f.hypothesis.clone(),
            fingerprint: f.id.clone(),
        })
        .collect()
}

fn vuln_class_from_str(class: &str) -> VulnClass {
    for candidate in [
        VulnClass::MissingSigner,
        VulnClass::MissingOwner,
        VulnClass::PdaBumpMisuse,
        VulnClass::ArbitraryCpi,
        VulnClass::TypeConfusion,
        VulnClass::Reinitialization,
        VulnClass::CloseWithoutZero,
        VulnClass::UncheckedRealloc,
        VulnClass::IntegerOverflow,
        VulnClass::StateMachineViolation,
        VulnClass::UnvalidatedRemainingAccounts,
        VulnClass::OracleValidation,
        VulnClass::TokenAuthorityMismatch,
        VulnClass::StalePostCpi,
        VulnClass::AccountAliasing,
    ] {
        if candidate.as_str() == class {
            return candidate;
        }
    }
    VulnClass::MissingSigner
}

fn render_report(report: &ScanReport, format: &str, output: Option<&std::path::Path>) -> Result<()> {
    match format {
        "json" => {
            let json = report.to_json()?;
            println!("{json}");
        }
        "markdown" => {
            let md = report.to_markdown();
            if let Some(out_dir) = output {
                std::fs::create_dir_all(out_dir)?;
                let report_path = out_dir.join("security_report.md");
                std::fs::write(&report_path, &md)?;
                println!("{} {}", "[+] Report saved to:".green(), report_path.display().to_string().yellow());
            } else {
                println!("{md}");
            }
        }
        "github" => {
            println!("{}", report.to_github_annotations());
        }
        _ => report.print_terminal(),
    }
    Ok(())
}

fn run_init() -> Result<()> {
    let workflow_dir = PathBuf::from(".github/workflows");
    let workflow_path = workflow_dir.join("sentinel.yml");

    if workflow_path.exists() {
        println!("{}", "[!] Workflow file already exists: .github/workflows/sentinel.yml".yellow());
        return Ok(());
    }

    std::fs::create_dir_all(&workflow_dir)?;

    let workflow_content = r#"name: Sentinel Security Scan

on:
  pull_request:
    branches: [ "master", "main" ]
  push:
    branches: [ "master", "main" ]

env:
  CARGO_TERM_COLOR: always

jobs:
  security_scan:
    name: Sentinel Scan
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3

      - name: Install Rust
        uses: actions-rs/toolchain@v1
        with:
          toolchain: stable
          override: true

      - name: Install Sentinel
        run: cargo install --path .

      - name: Run Security Scan
        run: sentinel scan . --format github
"#;

    std::fs::write(&workflow_path, workflow_content)?;

    println!(
        "{} {}",
        "[+] Generated GitHub Actions workflow:".green().bold(),
        workflow_path.display().to_string().yellow()
    );

    Ok(())
}

fn run_diff(old_path: PathBuf, new_path: PathBuf) -> Result<()> {
    println!("{}", "[*] Running Differential Analysis...".blue().bold());

    let old_abs = std::fs::canonicalize(&old_path).unwrap_or(old_path.clone());
    let new_abs = std::fs::canonicalize(&new_path).unwrap_or(new_path.clone());

    println!("{} {}", "[base]".dimmed(), old_abs.display());
    let old_report = run_scan(ScanRequest::new(old_abs.clone(), ScanMode::Scan)).context("baseline scan failed")?;

    println!("{} {}", "[target]".dimmed(), new_abs.display());
    let new_report = run_scan(ScanRequest::new(new_abs.clone(), ScanMode::Scan)).context("target scan failed")?;

    let old_ids: std::collections::HashSet<&str> = old_report.findings.iter().map(|f| f.id.as_str()).collect();
    let new_ids: std::collections::HashSet<&str> = new_report.findings.iter().map(|f| f.id.as_str()).collect();

    let new_risks: Vec<_> = new_report.findings.iter().filter(|f| !old_ids.contains(f.id.as_str())).collect();
    let fixed_issues: Vec<_> = old_report.findings.iter().filter(|f| !new_ids.contains(f.id.as_str())).collect();

    println!("\n{}", "=== Differential Analysis Results ===".white().bold());

    if new_risks.is_empty() && fixed_issues.is_empty() {
        println!("{}", "No security changes detected.".green());
        return Ok(());
    }

    if !new_risks.is_empty() {
        println!("\n{}", "[NEW RISKS DETECTED]".red().bold());
        for f in &new_risks {
            println!("  [{}] {} ({}:{})", f.class.red(), f.title, f.location.file, f.location.line);
        }
    }

    if !fixed_issues.is_empty() {
        println!("\n{}", "[ISSUES FIXED]".green().bold());
        for f in &fixed_issues {
            println!("  [{}] {} ({}:{})", f.class.green(), f.title, f.location.file, f.location.line);
        }
    }

    Ok(())
}

fn list_vuln_classes() {
    println!("{}", "[*] Vulnerability Classes Sentinel Detects:".green().bold());
    println!("{}", "-".repeat(60).cyan());

    for class in [
        VulnClass::MissingSigner,
        VulnClass::MissingOwner,
        VulnClass::PdaBumpMisuse,
        VulnClass::ArbitraryCpi,
        VulnClass::TypeConfusion,
        VulnClass::Reinitialization,
        VulnClass::CloseWithoutZero,
        VulnClass::UncheckedRealloc,
        VulnClass::IntegerOverflow,
        VulnClass::StateMachineViolation,
        VulnClass::UnvalidatedRemainingAccounts,
        VulnClass::OracleValidation,
        VulnClass::TokenAuthorityMismatch,
        VulnClass::StalePostCpi,
        VulnClass::AccountAliasing,
    ] {
        println!("  {} {}", class.as_str().cyan().bold(), class.title().white());
    }
}

fn load_suite(path: &std::path::Path) -> Result<Vec<GoldenRepo>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading suite file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing suite file {}", path.display()))
}

fn scan_golden_repo(repo: &GoldenRepo) -> Result<scorer::RepoScore> {
    let repo_root = std::path::Path::new(&repo.program_dir);
    let report = run_scan(ScanRequest::new(repo_root.to_path_buf(), ScanMode::Scan))
        .with_context(|| format!("scanning golden repo '{}'", repo.id))?;
    let actionable = actionable_from_records(&report);
    Ok(scorer::score_repo(repo, &actionable))
}

fn run_eval(command: EvalCommands) -> Result<()> {
    match command {
        EvalCommands::Run { suite } => {
            let repos = load_suite(&suite)?;
            scorer::validate_suite(&repos, &HttpRepoReachability::new())?;

            let mut repo_scores = Vec::new();
            for repo in &repos {
                repo_scores.push(scan_golden_repo(repo)?);
            }
            let suite_score = scorer::score_suite(repo_scores);
            println!("{}", serde_json::to_string_pretty(&suite_score)?);
        }
        EvalCommands::RunSingle { suite, repo_id } => {
            let repos = load_suite(&suite)?;
            let repo = repos
                .iter()
                .find(|r| r.id == repo_id)
                .ok_or_else(|| anyhow::anyhow!("no golden repo with id '{repo_id}' in suite"))?;
            let score = scan_golden_repo(repo)?;
            println!("{}", serde_json::to_string_pretty(&score)?);
        }
        EvalCommands::Fixtures { suite } => {
            let repos = load_suite(&suite)?;
            for repo in &repos {
                println!(
                    "{} [{}] {} expected findings, {} traps",
                    repo.id.cyan().bold(),
                    repo.framework,
                    repo.expected_findings.len(),
                    repo.false_positive_traps.len()
                );
            }
        }
        EvalCommands::Compare { baseline, current } => {
            let baseline_content = std::fs::read_to_string(&baseline)?;
            let current_content = std::fs::read_to_string(&current)?;
            let baseline_score: SuiteScore = serde_json::from_str(&baseline_content)?;
            let current_score: SuiteScore = serde_json::from_str(&current_content)?;

            let regressed = scorer::is_regression(&baseline_score, &current_score);
            println!(
                "baseline F1={:.3} current F1={:.3}",
                baseline_score.micro_average.f1, current_score.micro_average.f1
            );

            if regressed {
                println!("{}", "[!] Regression detected.".red().bold());
                std::process::exit(1);
            } else {
                println!("{}", "[+] No regression.".green().bold());
            }
        }
        EvalCommands::List { suite } => {
            let repos = load_suite(&suite)?;
            for repo in &repos {
                println!("{}", repo.id);
            }
        }
    }
    Ok(())
}
