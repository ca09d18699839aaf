//! # Fact Graph (C3)
//!
//! @title Typed Fact Graph over a Parsed Program
//! @author Ramprasad
//!
//! The Fact Graph is the process-wide immutable data product of the
//! parser (§4.2/§4.3). It owns every node produced while lifting source
//! files into [`crate::parser::AnalysisContext`]s, assigns each a
//! [`StableId`], and precomputes a sink neighborhood per sink so
//! downstream consumers — the candidate generator, class detectors, the
//! report builder — query the graph instead of re-walking source text.
//!
//! Construction happens once per scan in [`build`]; everything here is
//! read-only afterward (§3 "Lifecycle").

mod build;
mod query;

pub use build::build;

use crate::parser::{AccountType, ConstraintType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deterministic string identifier for a graph node, derived from file
/// path and structural position (§3 "StableId"). Re-parsing identical
/// source must yield byte-identical `StableId`s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(pub String);

impl StableId {
    pub fn instruction(file: &str, name: &str) -> Self {
        Self(format!("{file}::{name}"))
    }

    pub fn account(file: &str, instruction: &str, field: &str) -> Self {
        Self(format!("{file}::{instruction}::ctx.{field}"))
    }

    pub fn sink(file: &str, instruction: &str, kind: &str, line: usize) -> Self {
        Self(format!("{file}::{instruction}::sink.{kind}@{line}"))
    }

    pub fn guard(file: &str, instruction: &str, kind: &str, line: usize) -> Self {
        Self(format!("{file}::{instruction}::guard.{kind}@{line}"))
    }

    pub fn pda(file: &str, instruction: &str, line: usize) -> Self {
        Self(format!("{file}::{instruction}::pda@{line}"))
    }

    pub fn cpi(file: &str, instruction: &str, line: usize) -> Self {
        Self(format!("{file}::{instruction}::cpi@{line}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `{file, startLine, endLine, startCol, endCol}` (§3 "AstSpan"). Column
/// tracking is best-effort: the underlying `syn` AST is parsed without
/// retaining byte offsets, so spans here are line-granular and columns
/// are left at 0 rather than fabricated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstSpan {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl AstSpan {
    pub fn line(file: &str, line: usize) -> Self {
        Self {
            file: file.to_string(),
            start_line: line,
            end_line: line,
            start_col: 0,
            end_col: 0,
        }
    }

    pub fn range(file: &str, start_line: usize, end_line: usize) -> Self {
        Self {
            file: file.to_string(),
            start_line,
            end_line,
            start_col: 0,
            end_col: 0,
        }
    }

    pub fn len_lines(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Framework classification for a [`ProgramNode`] (§4.2 "Framework detection").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framework {
    Anchor,
    Native,
    Unknown,
}

/// A single source file belonging to a program, as recorded on the
/// [`ProgramNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub line_count: usize,
    pub content_hash: u64,
}

/// The program-level node: name, optional on-chain address, detected
/// framework, and the files that constitute it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramNode {
    pub name: Option<String>,
    pub address: Option<String>,
    pub framework: Framework,
    pub files: Vec<FileRecord>,
}

/// Visibility of an instruction's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Gated,
}

/// An instruction handler (§3 "Instruction").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionNode {
    pub id: StableId,
    pub name: String,
    pub accounts_struct: Option<String>,
    pub account_ids: Vec<StableId>,
    pub sink_ids: Vec<StableId>,
    pub guard_ids: Vec<StableId>,
    pub visibility: Visibility,
    pub required_signers: Vec<String>,
    pub parameters: Vec<(String, String)>,
    pub called_functions: Vec<String>,
    pub body_excerpt: String,
    pub span: AstSpan,
}

/// Anchor account wrapper classification, mirrored from
/// [`crate::parser::AccountType`] at graph level so graph consumers do
/// not need to depend on the parser's constraint-string representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountWrapper {
    Signer,
    Account(String),
    Program(String),
    UncheckedAccount,
    AccountInfo,
    InterfaceAccount(String),
    SystemProgram,
    SystemAccount,
    Other(String),
}

impl From<&AccountType> for AccountWrapper {
    fn from(ty: &AccountType) -> Self {
        match ty {
            AccountType::Signer => AccountWrapper::Signer,
            AccountType::Account(inner) => AccountWrapper::Account(inner.clone()),
            AccountType::Program(inner) => AccountWrapper::Program(inner.clone()),
            AccountType::UncheckedAccount => AccountWrapper::UncheckedAccount,
            AccountType::AccountInfo => AccountWrapper::AccountInfo,
            AccountType::InterfaceAccount(inner) => {
                AccountWrapper::InterfaceAccount(inner.clone())
            }
            AccountType::SystemProgram => AccountWrapper::SystemProgram,
            AccountType::SystemAccount => AccountWrapper::SystemAccount,
            AccountType::ProgramAccount(inner) => AccountWrapper::Other(format!("ProgramAccount<{inner}>")),
            AccountType::Unknown(inner) => AccountWrapper::Other(inner.clone()),
        }
    }
}

/// Constraint kind mirrored from [`crate::parser::ConstraintType`] (§3 "Constraint").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    Signer,
    Owner(String),
    HasOne(String),
    Constraint(String),
    Address(String),
    Seeds(Vec<String>),
    Bump,
    Init,
    InitIfNeeded,
    Close(String),
    Realloc { size: String, payer: String, zero: bool },
    TokenMint(String),
    TokenAuthority(String),
    TokenProgram(String),
    AssociatedToken(String),
    Mut,
    Other(String),
}

impl From<&ConstraintType> for ConstraintKind {
    fn from(c: &ConstraintType) -> Self {
        match c {
            ConstraintType::Signer => ConstraintKind::Signer,
            ConstraintType::Owner(e) => ConstraintKind::Owner(e.clone()),
            ConstraintType::HasOne(e) => ConstraintKind::HasOne(e.clone()),
            ConstraintType::Constraint(e) => ConstraintKind::Constraint(e.clone()),
            ConstraintType::Address(e) => ConstraintKind::Address(e.clone()),
            ConstraintType::Seeds(s) => ConstraintKind::Seeds(s.clone()),
            ConstraintType::Bump => ConstraintKind::Bump,
            ConstraintType::Init => ConstraintKind::Init,
            ConstraintType::InitIfNeeded => ConstraintKind::InitIfNeeded,
            ConstraintType::Close(e) => ConstraintKind::Close(e.clone()),
            ConstraintType::Realloc { size, payer, zero } => ConstraintKind::Realloc {
                size: size.clone(),
                payer: payer.clone(),
                zero: *zero,
            },
            ConstraintType::TokenMint(e) => ConstraintKind::TokenMint(e.clone()),
            ConstraintType::TokenAuthority(e) => ConstraintKind::TokenAuthority(e.clone()),
            ConstraintType::TokenProgram(e) => ConstraintKind::TokenProgram(e.clone()),
            ConstraintType::AssociatedToken(e) => ConstraintKind::AssociatedToken(e.clone()),
            ConstraintType::Mut => ConstraintKind::Mut,
            ConstraintType::Payer(e) => ConstraintKind::Other(format!("payer={e}")),
            ConstraintType::Space(e) => ConstraintKind::Other(format!("space={e}")),
            ConstraintType::Unknown(e) => ConstraintKind::Other(e.clone()),
        }
    }
}

/// An account field node (§3 "Account").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountNode {
    pub id: StableId,
    pub name: String,
    pub instruction: StableId,
    pub wrapper: AccountWrapper,
    pub raw_type: String,
    pub is_signer: bool,
    pub is_mut: bool,
    pub constraints: Vec<ConstraintKind>,
    pub pda: Option<StableId>,
    pub span: AstSpan,
}

/// Sink kind classification (§3 "Sink").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkKind {
    TokenTransfer,
    SolTransfer,
    TokenMintTo,
    TokenBurn,
    TokenApprove,
    TokenRevoke,
    SetAuthority,
    CloseAccount,
    SystemTransfer,
    LamportMutation,
    Invoke,
    InvokeSigned,
    AccountClose,
    AccountRealloc,
    SysvarInstructionsRead,
    StateWrite,
    OracleRead,
}

/// A sink node (§3 "Sink").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkNode {
    pub id: StableId,
    pub kind: SinkKind,
    pub instruction: StableId,
    pub accounts: Vec<String>,
    pub excerpt: String,
    pub span: AstSpan,
}

/// Guard kind, mirroring constraint kinds plus body-level checks (§3 "Guard").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardKind {
    Constraint(ConstraintKind),
    Require(String),
    Assert(String),
    IfCondition(String),
}

/// A guard node (§3 "Guard").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardNode {
    pub id: StableId,
    pub kind: GuardKind,
    pub protects: String,
    pub span: AstSpan,
}

/// Bump derivation source (§3 "PDA").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BumpSource {
    Canonical,
    Stored,
    UserProvided,
    Unknown,
}

/// Where the PDA derivation was found (§3 "PDA").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdaSource {
    Constraint,
    Inline,
}

/// A single seed expression, annotated for attacker control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedExpr {
    pub text: String,
    pub attacker_controlled: bool,
}

/// A PDA derivation node (§3 "PDA").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdaNode {
    pub id: StableId,
    pub seeds: Vec<SeedExpr>,
    pub bump_source: BumpSource,
    pub source: PdaSource,
    pub instruction: StableId,
    pub span: AstSpan,
}

/// CPI call classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpiCallType {
    Invoke,
    InvokeSigned,
}

/// The target program of a CPI, typed when statically known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpiTarget {
    Known(String),
    Dynamic,
}

/// A cross-program invocation node (§3 "CPI").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpiNode {
    pub id: StableId,
    pub target: CpiTarget,
    pub signer_seeds: Option<Vec<String>>,
    pub account_metas: Vec<String>,
    pub call_type: CpiCallType,
    pub program_validated: bool,
    pub instruction: StableId,
    pub span: AstSpan,
}

/// Precomputed bundle for one sink (§3 "Sink Neighborhood"). Detectors
/// query this, never the AST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkNeighborhood {
    pub sink: StableId,
    pub instruction: StableId,
    pub accounts_involved: Vec<String>,
    pub guards_present: Vec<StableId>,
    pub taint_paths: Vec<String>,
    pub missing_guards: Vec<String>,
}

/// The Fact Graph itself: every node keyed by [`StableId`], plus
/// precomputed sink neighborhoods and a struct-name index used by
/// [`query`] methods like `findField`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactGraph {
    pub program: Option<ProgramNode>,
    pub instructions: HashMap<StableId, InstructionNode>,
    pub accounts: HashMap<StableId, AccountNode>,
    pub sinks: HashMap<StableId, SinkNode>,
    pub guards: HashMap<StableId, GuardNode>,
    pub pdas: HashMap<StableId, PdaNode>,
    pub cpis: HashMap<StableId, CpiNode>,
    pub sink_neighborhoods: HashMap<StableId, SinkNeighborhood>,
    /// Accounts-struct name -> field ids, supporting `findField` without a
    /// linear scan over every account in the graph.
    pub struct_fields: HashMap<String, Vec<StableId>>,
    /// Deterministic iteration order for instructions, preserved from
    /// parse order so report output is stable across re-runs (§8 "Determinism").
    pub instruction_order: Vec<StableId>,
    /// Native dispatch remapping: function name -> match-arm variant name
    /// (§4.5 "Native instruction remapping").
    pub native_dispatch_aliases: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_deterministic_text() {
        let a = StableId::instruction("lib.rs", "withdraw");
        let b = StableId::instruction("lib.rs", "withdraw");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "lib.rs::withdraw");
    }

    #[test]
    fn account_wrapper_from_account_type() {
        let wrapper: AccountWrapper = (&AccountType::InterfaceAccount("Mint".to_string())).into();
        assert_eq!(wrapper, AccountWrapper::InterfaceAccount("Mint".to_string()));
    }
}
