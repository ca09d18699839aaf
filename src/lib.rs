//! # sentinel-core
//!
//! @title Solana Vulnerability Analysis Engine
//! @author Ramprasad
//!
//! A static analysis library for Solana smart contracts (Anchor and
//! native framework): Fact Graph construction over parsed programs,
//! sink-first candidate generation, graph-driven class detectors, Trust
//! Grade evidence filtering, a golden-suite evaluation harness, and a
//! report builder producing evidence chains, graph artifacts, and a
//! ship-readiness summary.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface: `scan` plus the evaluation CLI
//! - [`parser`] - AST parsing utilities for Rust/Anchor source code
//! - [`analysis`] - Taint tracking, scope analysis, cross-file program context
//! - [`ingest`] - Source discovery and Anchor/native program-directory detection
//! - [`graph`] - Fact graph construction over a parsed program (C3)
//! - [`candidates`] - Closed-set vulnerability classes and candidate generation (C4)
//! - [`class_detectors`] - Graph-driven detectors for oracle/native-owner/stale-CPI/type-confusion/state-machine classes (C5)
//! - [`grade`] - Trust-grade filtering and severity enforcement (C6)
//! - [`scorer`] - Golden-suite evaluation harness (C7)
//! - [`driver`] - End-to-end scan orchestration (`run_scan`)
//! - [`collaborators`] - Optional LLM/PoC collaborator trait seams
//! - [`error`] - Scan error taxonomy and non-fatal diagnostics
//! - [`report`] - Evidence chains, graph artifacts, program summary, and output formats (C8)
//! - [`poc_generator`] - Proof-plan/fix-plan text and the opt-in TypeScript PoC scaffold
//!
//! ## Example
//!
//! ```rust,ignore
//! use sentinel_core::driver::{run_scan, ScanMode, ScanRequest};
//!
//! let report = run_scan(ScanRequest::new("./my-program", ScanMode::Scan))?;
//! println!("ship ready: {}", report.summary.ship_ready);
//! ```

pub mod analysis;
pub mod candidates;
pub mod class_detectors;
pub mod cli;
pub mod collaborators;
pub mod driver;
pub mod error;
pub mod grade;
pub mod graph;
pub mod ingest;
pub mod parser;
pub mod poc_generator;
pub mod report;
pub mod scorer;

pub use cli::Cli;
pub use driver::{run_scan, ScanMode, ScanRequest};
pub use error::ScanError;
pub use parser::AnalysisContext;
pub use report::{ScanReport, Severity};
