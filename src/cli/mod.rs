//! # CLI Module
//!
//! @title Command Line Interface
//! @author Ramprasad
//!
//! Defines the command-line interface using `clap` derive macros: the
//! `scan` command drives [`crate::driver::run_scan`] directly, and an
//! `eval` subcommand tree exposes the golden-suite evaluation harness
//! (§6 "Evaluation CLI") — `run`, `run-single --repo=ID`, `fixtures`,
//! `compare --baseline=P --current=P`, `list`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sentinel command-line interface: static analysis scanner for Solana
/// smart contracts, plus its golden-suite evaluation harness.
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(author = "Ramprasad")]
#[command(version)]
#[command(about = "Static analysis security scanner for Solana smart contracts")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a Solana smart contract repository for vulnerabilities.
    Scan {
        /// Path to the repository to scan.
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Scan mode: `scan` (default, no external confirmation),
        /// `prove` (invokes the LLM/PoC collaborators if configured),
        /// or `fix-plan` (also attaches a `fixPlan` to every finding).
        #[arg(long, default_value = "scan")]
        mode: String,

        /// Output format for the security report.
        ///
        /// Supported formats: `terminal` (default), `json`, `markdown`, `github`.
        #[arg(short, long, default_value = "terminal")]
        format: String,

        /// Write an opt-in TypeScript PoC scaffold plus attack-path
        /// Markdown alongside the report (§4.8 "supplement").
        #[arg(long)]
        emit_poc_scaffold: bool,

        /// Output directory for reports and the PoC scaffold.
        ///
        /// If not specified, reports are printed to stdout and the
        /// scaffold (if requested) is written to `./exploits/`.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum severity level to include in results.
        ///
        /// Valid values: critical, high, medium, low, info
        #[arg(short, long)]
        severity: Option<String>,
    },

    /// Compare security findings between two program versions.
    ///
    /// Runs a full scan on both directories and reports new risks and
    /// fixed issues by fingerprint.
    Diff {
        /// Path to the old version (base).
        #[arg(value_name = "OLD_PATH")]
        old_path: PathBuf,

        /// Path to the new version (target).
        #[arg(value_name = "NEW_PATH")]
        new_path: PathBuf,
    },

    /// Initialize Sentinel configuration.
    ///
    /// Generates a GitHub Actions workflow file for CI/CD integration.
    Init,

    /// List the closed set of vulnerability classes Sentinel detects.
    List,

    /// Print version information.
    Version,

    /// Golden-suite evaluation harness (§6 "Evaluation CLI").
    Eval {
        #[command(subcommand)]
        command: EvalCommands,
    },
}

/// Evaluation CLI subcommands (§6 ambient "Evaluation CLI").
#[derive(Subcommand, Debug)]
pub enum EvalCommands {
    /// Scan every golden repo in the suite and print the suite-wide score.
    Run {
        /// Path to the golden suite file (JSON, a `Vec<GoldenRepo>`).
        #[arg(long, value_name = "PATH")]
        suite: PathBuf,
    },

    /// Scan a single golden repo by id and print its score.
    RunSingle {
        /// Path to the golden suite file.
        #[arg(long, value_name = "PATH")]
        suite: PathBuf,

        /// The `GoldenRepo.id` to score.
        #[arg(long = "repo")]
        repo_id: String,
    },

    /// Print the golden repos declared in a suite file without scoring them.
    Fixtures {
        #[arg(long, value_name = "PATH")]
        suite: PathBuf,
    },

    /// Compare a baseline suite score against a current one; exits
    /// non-zero on regression (§6 "Non-zero exit if regression...").
    Compare {
        /// Path to a previously saved `SuiteScore` JSON file.
        #[arg(long, value_name = "PATH")]
        baseline: PathBuf,

        /// Path to a previously saved `SuiteScore` JSON file.
        #[arg(long, value_name = "PATH")]
        current: PathBuf,
    },

    /// List the repo ids declared in a suite file.
    List {
        #[arg(long, value_name = "PATH")]
        suite: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify that the CLI definition is valid.
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
