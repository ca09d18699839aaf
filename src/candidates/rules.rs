//! Sink-first scanners and structural scanners (§4.4 table + bullet list).
//!
//! Grounded on the legacy per-class detectors this repo used to ship as
//! `crate::detectors::{missing_signer, missing_owner, pda_bump,
//! unchecked_transfer, authority_delegation, rent_bypass, account_usage,
//! scope_validation, integer_overflow}` (see `DESIGN.md`): the same
//! pattern vocabulary (authority-named fields, signer checks, financial-root
//! identifiers, PDA bump sourcing) reimplemented as queries over the Fact
//! Graph instead of per-file regex passes.

use super::{CandidateSource, InvolvedAccount, VulnCandidate, VulnClass};
use crate::graph::{
    AccountNode, AccountWrapper, BumpSource, ConstraintKind, CpiCallType, FactGraph,
    InstructionNode, SinkKind, StableId,
};
use crate::report::Severity;
use regex::Regex;
use std::sync::OnceLock;

/// Runs every sink-first and structural scanner over the whole graph and
/// returns the deduplicated, sorted candidate list (§4.4).
pub fn generate(graph: &FactGraph) -> Vec<VulnCandidate> {
    let mut out = Vec::new();
    for instruction_id in &graph.instruction_order {
        let Some(instruction) = graph.instruction(instruction_id) else {
            continue;
        };
        sink_first_candidates(graph, instruction, &mut out);
        structural_candidates(graph, instruction, &mut out);
    }
    super::dedup_and_sort(out)
}

const AUTHORITY_NAME_ROOTS: &[&str] = &["authority", "owner", "admin", "payer", "signer"];
const FINANCIAL_ROOTS: &[&str] = &[
    "amount", "balance", "lamports", "price", "fee", "rate", "supply", "reserve",
];

fn is_authority_named(name: &str) -> bool {
    let lower = name.to_lowercase();
    AUTHORITY_NAME_ROOTS.iter().any(|root| lower.contains(root))
}

fn file_of(_graph: &FactGraph, instruction: &InstructionNode) -> String {
    instruction.span.file.clone()
}

fn has_pda_signing_context(graph: &FactGraph, instruction_id: &StableId) -> bool {
    graph
        .cpis_of(instruction_id)
        .iter()
        .any(|c| matches!(c.call_type, CpiCallType::InvokeSigned))
}

fn involved(accounts: &[&AccountNode], names: &[String]) -> Vec<InvolvedAccount> {
    if names.is_empty() {
        return accounts
            .iter()
            .map(|a| InvolvedAccount {
                name: a.name.clone(),
                constraints: a.constraints.iter().map(|c| format!("{c:?}")).collect(),
            })
            .collect();
    }
    accounts
        .iter()
        .filter(|a| names.contains(&a.name))
        .map(|a| InvolvedAccount {
            name: a.name.clone(),
            constraints: a.constraints.iter().map(|c| format!("{c:?}")).collect(),
        })
        .collect()
}

fn sink_first_candidates(graph: &FactGraph, instruction: &InstructionNode, out: &mut Vec<VulnCandidate>) {
    let accounts: Vec<&AccountNode> = graph.accounts_of(&instruction.id);
    let file = file_of(graph, instruction);

    for sink_id in &instruction.sink_ids {
        let Some(sink) = graph.sinks.get(sink_id) else { continue };

        match sink.kind {
            SinkKind::TokenTransfer
            | SinkKind::SolTransfer
            | SinkKind::TokenMintTo
            | SinkKind::TokenBurn
            | SinkKind::SetAuthority => {
                emit_missing_signer_for_sink(graph, instruction, &accounts, sink, &file, out);
            }
            _ => {}
        }

        if sink.kind == SinkKind::AccountClose {
            emit_close_revive(instruction, &accounts, sink, &file, out);
        }

        if matches!(
            sink.kind,
            SinkKind::TokenTransfer | SinkKind::TokenMintTo | SinkKind::TokenBurn
        ) {
            emit_token_authority_mismatch(instruction, &accounts, sink, &file, out);
        }

        if matches!(sink.kind, SinkKind::Invoke | SinkKind::InvokeSigned) {
            emit_arbitrary_cpi(graph, instruction, sink, &file, out);
        }

        if sink.kind == SinkKind::OracleRead {
            emit_oracle_validation(graph, instruction, &accounts, sink, &file, out);
        }
    }
}

fn emit_missing_signer_for_sink(
    graph: &FactGraph,
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    sink: &crate::graph::SinkNode,
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    let authority_field = accounts.iter().find(|a| is_authority_named(&a.name));
    let has_pda_signer = has_pda_signing_context(graph, &instruction.id);

    let (severity, confidence, reason) = match authority_field {
        Some(field)
            if !field.is_signer
                && !graph.has_authority_check(
                    instruction.accounts_struct.as_deref().unwrap_or(""),
                    &field.name,
                    &instruction.body_excerpt,
                )
                && !has_pda_signer =>
        {
            (
                Severity::Critical,
                0.78,
                format!(
                    "'{}' is the authority for a value-critical sink but is never checked as a signer",
                    field.name
                ),
            )
        }
        None if !has_pda_signer => (
            Severity::High,
            0.6,
            "sink has no authority-named account and no PDA signing context".to_string(),
        ),
        _ => return,
    };

    let account_names: Vec<String> = if let Some(f) = authority_field {
        vec![f.name.clone()]
    } else {
        Vec::new()
    };

    out.push(VulnCandidate {
        id: String::new(),
        vuln_class: VulnClass::MissingSigner,
        severity,
        confidence,
        instruction: instruction.id.clone(),
        span: sink.span.clone(),
        involved_accounts: involved(accounts, &account_names),
        reason,
        sink_id: Some(sink.id.clone()),
        fingerprint: VulnCandidate::compute_fingerprint(
            VulnClass::MissingSigner,
            &instruction.name,
            file,
            sink.span.start_line,
            &account_names,
        ),
        excerpt: sink.excerpt.clone(),
        source: CandidateSource::Generator,
    });
}

/// A manual lamport-drain close (`**account.try_borrow_mut_lamports()? -=`,
/// as distinct from Anchor's trusted `close =` constraint) that zeroes no
/// discriminator on its own. Flags the drain when no authority-named
/// account on the instruction is signer-checked, since any caller can then
/// replay the drain and later re-credit the account to "revive" it (§4.4
/// table "Manual lamport-drain close").
fn emit_close_revive(
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    sink: &crate::graph::SinkNode,
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    let authority_field = accounts.iter().find(|a| is_authority_named(&a.name));
    let signer_checked = authority_field.is_some_and(|f| {
        f.is_signer || f.constraints.iter().any(|c| matches!(c, ConstraintKind::Signer))
    });
    if signer_checked {
        return;
    }

    let account_names: Vec<String> = authority_field.map(|f| vec![f.name.clone()]).unwrap_or_default();
    out.push(VulnCandidate {
        id: String::new(),
        vuln_class: VulnClass::CloseWithoutZero,
        severity: Severity::Critical,
        confidence: 0.65,
        instruction: instruction.id.clone(),
        span: sink.span.clone(),
        involved_accounts: involved(accounts, &account_names),
        reason: "manual lamport-drain close with no signer-checked authority; the account can be revived and re-closed"
            .to_string(),
        sink_id: Some(sink.id.clone()),
        fingerprint: VulnCandidate::compute_fingerprint(
            VulnClass::CloseWithoutZero,
            &instruction.name,
            file,
            sink.span.start_line,
            &account_names,
        ),
        excerpt: sink.excerpt.clone(),
        source: CandidateSource::Generator,
    });
}

fn emit_token_authority_mismatch(
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    sink: &crate::graph::SinkNode,
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    let token_accounts: Vec<&&AccountNode> = accounts
        .iter()
        .filter(|a| matches!(&a.wrapper, AccountWrapper::Account(t) | AccountWrapper::InterfaceAccount(t) if t.contains("TokenAccount")))
        .collect();

    for account in token_accounts {
        let has_authority_constraint = account
            .constraints
            .iter()
            .any(|c| matches!(c, ConstraintKind::TokenAuthority(_)));
        if has_authority_constraint || !account.is_mut {
            continue;
        }

        let account_names = vec![account.name.clone()];
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::TokenAuthorityMismatch,
            severity: Severity::High,
            confidence: 0.62,
            instruction: instruction.id.clone(),
            span: sink.span.clone(),
            involved_accounts: involved(accounts, &account_names),
            reason: format!(
                "token account '{}' is used in a transfer/mint/burn sink with no `token::authority` constraint",
                account.name
            ),
            sink_id: Some(sink.id.clone()),
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::TokenAuthorityMismatch,
                &instruction.name,
                file,
                sink.span.start_line,
                &account_names,
            ),
            excerpt: sink.excerpt.clone(),
            source: CandidateSource::Generator,
        });
    }
}

fn emit_arbitrary_cpi(
    graph: &FactGraph,
    instruction: &InstructionNode,
    sink: &crate::graph::SinkNode,
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    let unvalidated = graph
        .cpis_of(&instruction.id)
        .into_iter()
        .find(|c| c.span.start_line == sink.span.start_line && !c.program_validated);

    let Some(cpi) = unvalidated else { return };
    let accounts = graph.accounts_of(&instruction.id);

    out.push(VulnCandidate {
        id: String::new(),
        vuln_class: VulnClass::ArbitraryCpi,
        severity: Severity::Critical,
        confidence: 0.75,
        instruction: instruction.id.clone(),
        span: sink.span.clone(),
        involved_accounts: involved(&accounts, &cpi.account_metas),
        reason: "invoke/invoke_signed target program is not statically validated against a known Program<T> or constant key".to_string(),
        sink_id: Some(sink.id.clone()),
        fingerprint: VulnCandidate::compute_fingerprint(
            VulnClass::ArbitraryCpi,
            &instruction.name,
            file,
            sink.span.start_line,
            &cpi.account_metas,
        ),
        excerpt: sink.excerpt.clone(),
        source: CandidateSource::Generator,
    });
}

const ORACLE_NAME_ROOTS: &[&str] = &["oracle", "price_feed", "feed", "aggregator", "pyth", "switchboard"];

fn staleness_check_near(body: &str, from_line_offset: usize) -> bool {
    let lines: Vec<&str> = body.lines().collect();
    let end = (from_line_offset + 15).min(lines.len());
    lines[from_line_offset.min(lines.len())..end].iter().any(|line| {
        let lower = line.to_lowercase();
        lower.contains("stale")
            || lower.contains("publish_time")
            || lower.contains("publish_slot")
            || lower.contains("updated_at")
            || lower.contains("clock.slot")
            || lower.contains("clock.unix_timestamp")
            || lower.contains("no_older_than")
            || lower.contains("max_age")
    })
}

/// §4.4 table "oracle_read": CRITICAL when the oracle account field carries
/// no owner/address/constraint validation at all, HIGH when it does but no
/// staleness check follows the read. Complements the class detector's
/// staleness/confidence/sanity scan, which fires independently of whether
/// the oracle account itself is validated.
fn emit_oracle_validation(
    graph: &FactGraph,
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    sink: &crate::graph::SinkNode,
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    let oracle_field = accounts
        .iter()
        .find(|a| {
            let lower = a.name.to_lowercase();
            ORACLE_NAME_ROOTS.iter().any(|root| lower.contains(root))
        })
        .copied();

    let owner_validated = oracle_field.is_some_and(|f| graph.has_owner_validation(&f.id));
    let offset = sink.span.start_line.saturating_sub(instruction.span.start_line);
    let staleness_checked = staleness_check_near(&instruction.body_excerpt, offset);

    if owner_validated && staleness_checked {
        return;
    }

    let (severity, confidence, reason) = if !owner_validated {
        (
            Severity::Critical,
            0.82,
            "oracle account has no owner, address, or constraint validation guarding it".to_string(),
        )
    } else {
        (
            Severity::High,
            0.6,
            "oracle account is owner-validated but no staleness check follows the price read".to_string(),
        )
    };

    let account_names: Vec<String> = oracle_field.map(|f| vec![f.name.clone()]).unwrap_or_default();
    out.push(VulnCandidate {
        id: String::new(),
        vuln_class: VulnClass::OracleValidation,
        severity,
        confidence,
        instruction: instruction.id.clone(),
        span: sink.span.clone(),
        involved_accounts: involved(accounts, &account_names),
        reason,
        sink_id: Some(sink.id.clone()),
        fingerprint: VulnCandidate::compute_fingerprint(
            VulnClass::OracleValidation,
            &instruction.name,
            file,
            sink.span.start_line,
            &account_names,
        ),
        excerpt: sink.excerpt.clone(),
        source: CandidateSource::Generator,
    });
}

fn structural_candidates(graph: &FactGraph, instruction: &InstructionNode, out: &mut Vec<VulnCandidate>) {
    let accounts = graph.accounts_of(&instruction.id);
    let file = file_of(graph, instruction);

    emit_instruction_level_missing_signer(graph, instruction, &accounts, &file, out);
    emit_missing_owner(instruction, &accounts, &file, out);
    emit_reinit(instruction, &accounts, &file, out);
    emit_pda_derivation(graph, instruction, &file, out);
    emit_integer_overflow(instruction, &file, out);
    emit_unchecked_realloc(instruction, &accounts, &file, out);
    emit_unvalidated_remaining_accounts(instruction, &file, out);
    emit_account_aliasing(instruction, &accounts, &file, out);
}

fn reaches_dangerous_sink(graph: &FactGraph, instruction: &InstructionNode) -> bool {
    instruction.sink_ids.iter().any(|id| {
        graph.sinks.get(id).is_some_and(|s| {
            matches!(
                s.kind,
                SinkKind::TokenTransfer
                    | SinkKind::SolTransfer
                    | SinkKind::TokenMintTo
                    | SinkKind::TokenBurn
                    | SinkKind::SetAuthority
                    | SinkKind::AccountClose
                    | SinkKind::Invoke
                    | SinkKind::InvokeSigned
            )
        })
    })
}

fn emit_instruction_level_missing_signer(
    graph: &FactGraph,
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    if !reaches_dangerous_sink(graph, instruction) {
        return;
    }
    let has_signer_field = accounts
        .iter()
        .any(|a| a.is_signer || a.constraints.iter().any(|c| matches!(c, ConstraintKind::Signer)));
    if has_signer_field {
        return;
    }

    out.push(VulnCandidate {
        id: String::new(),
        vuln_class: VulnClass::MissingSigner,
        severity: Severity::Critical,
        confidence: 0.7,
        instruction: instruction.id.clone(),
        span: instruction.span.clone(),
        involved_accounts: involved(accounts, &[]),
        reason: "instruction reaches a value-critical sink but its accounts struct has no Signer field or signer constraint at all".to_string(),
        sink_id: None,
        fingerprint: VulnCandidate::compute_fingerprint(
            VulnClass::MissingSigner,
            &instruction.name,
            file,
            instruction.span.start_line,
            &[],
        ),
        excerpt: instruction.body_excerpt.lines().next().unwrap_or("").to_string(),
        source: CandidateSource::Generator,
    });
}

fn emit_missing_owner(
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    for account in accounts {
        if !account.is_mut {
            continue;
        }
        if !matches!(account.wrapper, AccountWrapper::UncheckedAccount | AccountWrapper::AccountInfo) {
            continue;
        }
        let has_guard = account.constraints.iter().any(|c| {
            matches!(
                c,
                ConstraintKind::Constraint(_) | ConstraintKind::Address(_) | ConstraintKind::Owner(_)
            )
        });
        if has_guard {
            continue;
        }

        let account_names = vec![account.name.clone()];
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::MissingOwner,
            severity: Severity::High,
            confidence: 0.55,
            instruction: instruction.id.clone(),
            span: account.span.clone(),
            involved_accounts: involved(accounts, &account_names),
            reason: format!(
                "'{}' is a mutable UncheckedAccount/AccountInfo with no constraint, address, or owner check",
                account.name
            ),
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::MissingOwner,
                &instruction.name,
                file,
                account.span.start_line,
                &account_names,
            ),
            excerpt: format!("{}: {}", account.name, account.raw_type),
            source: CandidateSource::Generator,
        });
    }
}

fn emit_reinit(
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    for account in accounts {
        let is_init_if_needed = account
            .constraints
            .iter()
            .any(|c| matches!(c, ConstraintKind::InitIfNeeded));
        if !is_init_if_needed {
            continue;
        }

        let guarded = instruction.body_excerpt.contains("is_initialized")
            || instruction.body_excerpt.contains("already")
            || instruction.body_excerpt.contains("AlreadyInitialized");
        if guarded {
            continue;
        }

        let account_names = vec![account.name.clone()];
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::Reinitialization,
            severity: Severity::Medium,
            confidence: 0.5,
            instruction: instruction.id.clone(),
            span: account.span.clone(),
            involved_accounts: involved(accounts, &account_names),
            reason: format!(
                "'{}' uses init_if_needed with no body-level re-initialization guard",
                account.name
            ),
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::Reinitialization,
                &instruction.name,
                file,
                account.span.start_line,
                &account_names,
            ),
            excerpt: format!("{}: init_if_needed", account.name),
            source: CandidateSource::Generator,
        });
    }
}

fn emit_pda_derivation(graph: &FactGraph, instruction: &InstructionNode, file: &str, out: &mut Vec<VulnCandidate>) {
    for pda in graph.pdas_of(&instruction.id) {
        let (severity, confidence, reason) = match pda.bump_source {
            BumpSource::UserProvided => (
                Severity::High,
                0.7,
                "PDA bump is sourced from a caller-supplied parameter rather than the canonical bump".to_string(),
            ),
            BumpSource::Unknown
                if matches!(pda.source, crate::graph::PdaSource::Constraint)
                    && !pda.seeds.is_empty() =>
            {
                (
                    Severity::Medium,
                    0.45,
                    "seeds constraint present without an accompanying bump constraint".to_string(),
                )
            }
            _ => continue,
        };

        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::PdaBumpMisuse,
            severity,
            confidence,
            instruction: instruction.id.clone(),
            span: pda.span.clone(),
            involved_accounts: Vec::new(),
            reason,
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::PdaBumpMisuse,
                &instruction.name,
                file,
                pda.span.start_line,
                &[],
            ),
            excerpt: pda.seeds.iter().map(|s| s.text.clone()).collect::<Vec<_>>().join(", "),
            source: CandidateSource::Generator,
        });
    }
}

fn arithmetic_rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([a-zA-Z_][a-zA-Z0-9_]*)\s*(\+|-|\*|/)\s*[a-zA-Z0-9_.]+").unwrap()
    })
}

fn emit_integer_overflow(instruction: &InstructionNode, file: &str, out: &mut Vec<VulnCandidate>) {
    let checked_markers = ["checked_", "saturating_", "overflowing_", "try_"];

    for (offset, line) in instruction.body_excerpt.lines().enumerate() {
        if checked_markers.iter().any(|m| line.contains(m)) {
            continue;
        }
        let Some(caps) = arithmetic_rule_re().captures(line) else {
            continue;
        };
        let ident = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
        if !FINANCIAL_ROOTS.iter().any(|root| ident.contains(root)) {
            continue;
        }

        let line_no = instruction.span.start_line + offset;
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::IntegerOverflow,
            severity: Severity::High,
            confidence: 0.4,
            instruction: instruction.id.clone(),
            span: crate::graph::AstSpan::line(file, line_no),
            involved_accounts: Vec::new(),
            reason: format!(
                "unchecked arithmetic on financial-root identifier '{ident}'"
            ),
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::IntegerOverflow,
                &instruction.name,
                file,
                line_no,
                &[],
            ),
            excerpt: line.trim().to_string(),
            source: CandidateSource::Generator,
        });
    }
}

fn emit_unchecked_realloc(
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    for account in accounts {
        let realloc_zero = account.constraints.iter().find_map(|c| match c {
            ConstraintKind::Realloc { zero, .. } => Some(*zero),
            _ => None,
        });
        let Some(zero) = realloc_zero else { continue };
        if zero {
            continue;
        }

        let account_names = vec![account.name.clone()];
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::UncheckedRealloc,
            severity: Severity::Medium,
            confidence: 0.45,
            instruction: instruction.id.clone(),
            span: account.span.clone(),
            involved_accounts: involved(accounts, &account_names),
            reason: format!("'{}' is reallocated without the `zero` flag", account.name),
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::UncheckedRealloc,
                &instruction.name,
                file,
                account.span.start_line,
                &account_names,
            ),
            excerpt: format!("{}: realloc(zero = false)", account.name),
            source: CandidateSource::Generator,
        });
    }

    let manual_realloc = instruction.body_excerpt.contains(".realloc(")
        && !instruction.body_excerpt.to_lowercase().contains("fill(0")
        && !instruction.body_excerpt.to_lowercase().contains("memset");
    if manual_realloc {
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::UncheckedRealloc,
            severity: Severity::Medium,
            confidence: 0.4,
            instruction: instruction.id.clone(),
            span: instruction.span.clone(),
            involved_accounts: Vec::new(),
            reason: "manual .realloc( call with no preceding zero-fill of the old buffer".to_string(),
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::UncheckedRealloc,
                &instruction.name,
                file,
                instruction.span.start_line,
                &[],
            ),
            excerpt: "manual realloc".to_string(),
            source: CandidateSource::Generator,
        });
    }
}

fn emit_unvalidated_remaining_accounts(
    instruction: &InstructionNode,
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    if !instruction.body_excerpt.contains("remaining_accounts") {
        return;
    }
    let has_len_check = instruction.body_excerpt.contains("remaining_accounts.len()")
        || (instruction.body_excerpt.contains("require!") && instruction.body_excerpt.contains("remaining_accounts"));
    let has_per_account_check = instruction.body_excerpt.contains(".owner ==")
        || instruction.body_excerpt.contains(".key() ==");
    if has_len_check && has_per_account_check {
        return;
    }

    out.push(VulnCandidate {
        id: String::new(),
        vuln_class: VulnClass::UnvalidatedRemainingAccounts,
        severity: Severity::High,
        confidence: 0.55,
        instruction: instruction.id.clone(),
        span: instruction.span.clone(),
        involved_accounts: Vec::new(),
        reason: "ctx.remaining_accounts is indexed without a length check and a per-account owner/key check".to_string(),
        sink_id: None,
        fingerprint: VulnCandidate::compute_fingerprint(
            VulnClass::UnvalidatedRemainingAccounts,
            &instruction.name,
            file,
            instruction.span.start_line,
            &[],
        ),
        excerpt: "remaining_accounts".to_string(),
        source: CandidateSource::Generator,
    });
}

fn emit_account_aliasing(
    instruction: &InstructionNode,
    accounts: &[&AccountNode],
    file: &str,
    out: &mut Vec<VulnCandidate>,
) {
    for i in 0..accounts.len() {
        for j in (i + 1)..accounts.len() {
            let a = accounts[i];
            let b = accounts[j];
            if a.raw_type != b.raw_type {
                continue;
            }
            if !(a.is_mut || b.is_mut) {
                continue;
            }
            let distinguished = a.constraints.iter().any(|c| {
                matches!(c, ConstraintKind::Address(_))
                    || matches!(c, ConstraintKind::HasOne(target) if !b.name.contains(target.as_str()))
                    || matches!(c, ConstraintKind::Seeds(_))
            }) || b.constraints.iter().any(|c| {
                matches!(c, ConstraintKind::Address(_)) || matches!(c, ConstraintKind::Seeds(_))
            });
            if distinguished {
                continue;
            }

            let account_names = vec![a.name.clone(), b.name.clone()];
            out.push(VulnCandidate {
                id: String::new(),
                vuln_class: VulnClass::AccountAliasing,
                severity: Severity::Medium,
                confidence: 0.4,
                instruction: instruction.id.clone(),
                span: a.span.clone(),
                involved_accounts: involved(accounts, &account_names),
                reason: format!(
                    "'{}' and '{}' share type '{}' with no constraint proving them distinct",
                    a.name, b.name, a.raw_type
                ),
                sink_id: None,
                fingerprint: VulnCandidate::compute_fingerprint(
                    VulnClass::AccountAliasing,
                    &instruction.name,
                    file,
                    a.span.start_line,
                    &account_names,
                ),
                excerpt: format!("{} / {}", a.name, b.name),
                source: CandidateSource::Generator,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::ingest::IngestedFile;

    fn graph_from_source(source: &str) -> FactGraph {
        let file = IngestedFile {
            path: "lib.rs".to_string(),
            content: source.to_string(),
            line_count: source.lines().count(),
            content_hash: 0,
        };
        let mut diagnostics = Diagnostics::new();
        crate::graph::build(&[file], &mut diagnostics)
    }

    #[test]
    fn fix_missing_signer_scenario() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod vault {
                use super::*;
                pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
                    token::transfer(ctx.accounts.into(), amount)?;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Withdraw<'info> {
                #[account(mut)]
                pub vault: Account<'info, TokenAccount>,
                pub authority: AccountInfo<'info>,
            }
        "#;

        let graph = graph_from_source(source);
        let candidates = generate(&graph);
        let missing_signer = candidates
            .iter()
            .find(|c| matches!(c.vuln_class, VulnClass::MissingSigner) && c.involved_accounts.iter().any(|a| a.name == "authority"));
        assert!(missing_signer.is_some(), "expected a missing_signer candidate on 'authority'");
        assert_eq!(missing_signer.unwrap().severity, Severity::Critical);
    }

    #[test]
    fn fix_integer_overflow_scenario_flags_unchecked_arithmetic() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod fees {
                use super::*;
                pub fn collect_fee(ctx: Context<CollectFee>, amount: u64) -> Result<()> {
                    let fee = amount * fee_bps / 10000;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct CollectFee<'info> {
                pub authority: Signer<'info>,
            }
        "#;

        let graph = graph_from_source(source);
        let candidates = generate(&graph);
        assert!(candidates.iter().any(|c| matches!(c.vuln_class, VulnClass::IntegerOverflow)));
    }

    #[test]
    fn checked_arithmetic_suppresses_integer_overflow_candidate() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod fees {
                use super::*;
                pub fn collect_fee(ctx: Context<CollectFee>, amount: u64) -> Result<()> {
                    let fee = amount.checked_mul(fee_bps).unwrap() / 10000;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct CollectFee<'info> {
                pub authority: Signer<'info>,
            }
        "#;

        let graph = graph_from_source(source);
        let candidates = generate(&graph);
        assert!(!candidates.iter().any(|c| matches!(c.vuln_class, VulnClass::IntegerOverflow)));
    }

    #[test]
    fn fix_oracle_read_scenario_with_unvalidated_account_is_critical() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod perp {
                use super::*;
                pub fn read_price(ctx: Context<ReadPrice>) -> Result<()> {
                    let price = ctx.accounts.oracle.get_price()?;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct ReadPrice<'info> {
                pub oracle: AccountInfo<'info>,
            }
        "#;

        let graph = graph_from_source(source);
        let candidates = generate(&graph);
        let finding = candidates.iter().find(|c| {
            matches!(c.vuln_class, VulnClass::OracleValidation)
                && matches!(c.source, CandidateSource::Generator)
        });
        assert!(finding.is_some(), "expected a generator oracle_validation candidate");
        assert_eq!(finding.unwrap().severity, Severity::Critical);
    }

    #[test]
    fn oracle_read_with_owner_validated_account_and_staleness_check_is_not_flagged_by_generator() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod perp {
                use super::*;
                pub fn read_price(ctx: Context<ReadPrice>) -> Result<()> {
                    let price = ctx.accounts.oracle.get_price()?;
                    require!(price.publish_time > clock.unix_timestamp - 60, ErrorCode::Stale);
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct ReadPrice<'info> {
                #[account(owner = pyth_program::ID)]
                pub oracle: AccountInfo<'info>,
            }
        "#;

        let graph = graph_from_source(source);
        let candidates = generate(&graph);
        assert!(!candidates
            .iter()
            .any(|c| matches!(c.vuln_class, VulnClass::OracleValidation) && matches!(c.source, CandidateSource::Generator)));
    }
}
