//! # Class Detectors (C5)
//!
//! @title Gap-Filling Detectors Beyond Sink-First Structural Queries
//! @author Ramprasad
//!
//! The candidate generator (§4.4) is purely structural: it only ever
//! queries precomputed graph facts. A handful of vulnerability classes
//! need a little more — a staleness-window scan after an oracle read, a
//! native program's raw `AccountInfo.owner` comparison, a second read of
//! account data after a CPI without a reload. Those live here as
//! independent detectors (§4.5), each producing [`crate::candidates::VulnCandidate`]s
//! tagged with [`crate::candidates::CandidateSource::ClassDetector`] and an ID
//! range disjoint from the generator's, then merged into the same
//! fingerprint pool by [`crate::candidates::dedup_and_sort`].
//!
//! Grounded on the legacy `crate::detectors::oracle_risks` (staleness
//! window heuristic), `crate::detectors::missing_owner` (native owner
//! checks), and `crate::detectors::cpi_reentrancy` (post-CPI state
//! reads) — see `DESIGN.md`.

use crate::candidates::{CandidateSource, InvolvedAccount, VulnCandidate, VulnClass};
use crate::graph::{AstSpan, FactGraph, Framework, SinkKind};
use crate::report::Severity;
use regex::Regex;
use std::sync::OnceLock;

/// Runs every class detector over the graph and returns its raw (not yet
/// deduplicated) candidates. The driver merges this with the generator's
/// output before calling [`crate::candidates::dedup_and_sort`] once (§4.5).
pub fn run_all(graph: &FactGraph) -> Vec<VulnCandidate> {
    let mut out = Vec::new();
    oracle_validation(graph, &mut out);
    native_missing_owner(graph, &mut out);
    stale_post_cpi(graph, &mut out);
    type_confusion(graph, &mut out);
    state_machine_violation(graph, &mut out);
    out
}

fn staleness_window_ok(body: &str, from_line_offset: usize) -> bool {
    let lines: Vec<&str> = body.lines().collect();
    let end = (from_line_offset + 15).min(lines.len());
    lines[from_line_offset.min(lines.len())..end].iter().any(|line| {
        let lower = line.to_lowercase();
        lower.contains("staleness")
            || lower.contains("stale")
            || lower.contains("publish_time")
            || lower.contains("publish_slot")
            || lower.contains("updated_at")
            || lower.contains("clock.slot")
            || lower.contains("clock.unix_timestamp")
            || lower.contains("no_older_than")
            || lower.contains("max_age")
    })
}

/// Confidence-interval regex family (§4.5 oracle_validation): pyth/
/// switchboard confidence bands, deviation thresholds, TWAP usage.
fn confidence_pattern_present(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)confidence|deviation|twap").unwrap());
    re.is_match(text)
}

/// Price-sanity regex family (§4.5 oracle_validation): a plain positivity
/// bound on the decoded price.
fn sanity_pattern_present(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"price\s*>\s*0").unwrap());
    re.is_match(text)
}

/// Called-function names that imply the surrounding code already performs
/// oracle validation somewhere the three regex families don't literally
/// match (a helper function call rather than inline checks).
const VALIDATING_CALL_MARKERS: &[&str] = &["validate", "check_oracle", "oracle_check", "verify_price", "staleness"];

fn native_oracle_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)get_price|oracle|pyth|switchboard|aggregator").unwrap())
}

/// Hard cap on oracle findings per program (§4.5 "at most 5 oracle
/// findings per program") so a chatty price-consuming program doesn't
/// drown the report in near-identical candidates.
const MAX_ORACLE_FINDINGS: usize = 5;

/// Flags `OracleRead` sinks with none of the staleness/confidence/sanity
/// regex families present in the surrounding lines, and no called
/// function name suggesting validation happens elsewhere (legacy
/// `oracle_risks` heuristic, lifted onto the graph's sink excerpts).
/// Severity splits on whether any guard at all protects the sink's
/// instruction: CRITICAL when none do, HIGH when at least one does but
/// it still isn't one of the three oracle-specific families.
fn oracle_validation(graph: &FactGraph, out: &mut Vec<VulnCandidate>) {
    let mut emitted = 0usize;
    let mut any_oracle_sink = false;

    for sink in graph.sinks.values() {
        if sink.kind != SinkKind::OracleRead {
            continue;
        }
        any_oracle_sink = true;
        if emitted >= MAX_ORACLE_FINDINGS {
            break;
        }
        let Some(instruction) = graph.instruction(&sink.instruction) else {
            continue;
        };
        let offset = sink.span.start_line.saturating_sub(instruction.span.start_line);
        let body = &instruction.body_excerpt;

        let validated = staleness_window_ok(body, offset)
            || confidence_pattern_present(body)
            || sanity_pattern_present(body)
            || instruction
                .called_functions
                .iter()
                .any(|f| VALIDATING_CALL_MARKERS.iter().any(|marker| f.contains(marker)));
        if validated {
            continue;
        }

        let guards_present = graph
            .sink_neighborhood(&sink.id)
            .is_some_and(|n| !n.guards_present.is_empty());
        let (severity, confidence) = if guards_present {
            (Severity::High, 0.65)
        } else {
            (Severity::Critical, 0.82)
        };

        let account_names: Vec<String> = Vec::new();
        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::OracleValidation,
            severity,
            confidence,
            instruction: instruction.id.clone(),
            span: sink.span.clone(),
            involved_accounts: Vec::new(),
            reason: "oracle price is read with no staleness, confidence, or sanity check, and no validating call, in the surrounding lines".to_string(),
            sink_id: Some(sink.id.clone()),
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::OracleValidation,
                &instruction.name,
                &sink.span.file,
                sink.span.start_line,
                &account_names,
            ),
            excerpt: sink.excerpt.clone(),
            source: CandidateSource::ClassDetector("oracle_validation"),
        });
        emitted += 1;
    }

    if emitted >= MAX_ORACLE_FINDINGS || any_oracle_sink {
        return;
    }

    // Native programs write oracle reads with enough syntactic variance
    // (raw struct unpacking rather than a dotted `.get_price()` call) that
    // the sink classifier sometimes misses them entirely. Re-scan the
    // body text directly as a fallback (§4.5 "native-program text-rescan").
    let Some(program) = &graph.program else { return };
    if program.framework != Framework::Native {
        return;
    }

    for instruction in graph.instructions.values() {
        if emitted >= MAX_ORACLE_FINDINGS {
            return;
        }
        let lines: Vec<&str> = instruction.body_excerpt.lines().collect();
        for (offset, line) in lines.iter().enumerate() {
            if emitted >= MAX_ORACLE_FINDINGS {
                return;
            }
            if !native_oracle_text_re().is_match(line) {
                continue;
            }
            if staleness_window_ok(&instruction.body_excerpt, offset) {
                continue;
            }

            let line_no = instruction.span.start_line + offset;
            out.push(VulnCandidate {
                id: String::new(),
                vuln_class: VulnClass::OracleValidation,
                severity: Severity::High,
                confidence: 0.65,
                instruction: instruction.id.clone(),
                span: AstSpan::line(&instruction.span.file, line_no),
                involved_accounts: Vec::new(),
                reason: "native program reads an oracle-like field with no staleness check nearby, recovered via text rescan since the sink classifier did not flag it".to_string(),
                sink_id: None,
                fingerprint: VulnCandidate::compute_fingerprint(
                    VulnClass::OracleValidation,
                    &instruction.name,
                    &instruction.span.file,
                    line_no,
                    &[],
                ),
                excerpt: line.trim().to_string(),
                source: CandidateSource::ClassDetector("oracle_validation_native_rescan"),
            });
            emitted += 1;
            break;
        }
    }
}

/// Owner-check markers §4.5 names: a raw `account.owner == program_id`
/// comparison, an `assert_eq!` mentioning `owner`, or a call to one of the
/// two helper functions native programs commonly wrap that comparison in.
fn owner_check_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\w+\.owner\s*(?:==|!=)|assert_eq!\([^;]*owner[^;]*\)|check_program_account|assert_owned_by",
        )
        .unwrap()
    })
}

/// Matches a deserialization call site that binds an account variable
/// (§4.5 "`try_from_slice|unpack|unpack_unchecked|Account::unpack|*::unpack`").
fn deserialize_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"let\s+(?:mut\s+)?(\w+)\s*[:=][^;]*?(?:try_from_slice|unpack)\s*\(").unwrap()
    })
}

const NATIVE_OWNER_CHECK_WINDOW: usize = 15;

/// Native (non-Anchor) programs have no `#[derive(Accounts)]` constraint
/// layer, so owner checks are raw `account.owner == program_id`
/// comparisons (or an equivalent helper call) in the handler body. For
/// each deserialization call site, searches the surrounding 15 lines and
/// then falls back to the full body for an owner-check marker; on miss
/// emits `missing_owner` with the deserialized identifier as the
/// involved account, deduplicated per `(instruction, account)` (§4.5
/// "Native missing_owner").
fn native_missing_owner(graph: &FactGraph, out: &mut Vec<VulnCandidate>) {
    let Some(program) = &graph.program else { return };
    if program.framework != Framework::Native {
        return;
    }

    for instruction in graph.instructions.values() {
        let lines: Vec<&str> = instruction.body_excerpt.lines().collect();
        let mut seen_accounts = std::collections::HashSet::new();

        for (line_offset, line) in lines.iter().enumerate() {
            let Some(caps) = deserialize_re().captures(line) else { continue };
            let account_name = caps[1].to_string();
            if !seen_accounts.insert(account_name.clone()) {
                continue;
            }

            let window_start = line_offset.saturating_sub(NATIVE_OWNER_CHECK_WINDOW);
            let window_end = (line_offset + NATIVE_OWNER_CHECK_WINDOW).min(lines.len());
            let window = lines[window_start..window_end].join("\n");
            if owner_check_re().is_match(&window) || owner_check_re().is_match(&instruction.body_excerpt) {
                continue;
            }

            out.push(VulnCandidate {
                id: String::new(),
                vuln_class: VulnClass::MissingOwner,
                severity: Severity::High,
                confidence: 0.72,
                instruction: instruction.id.clone(),
                span: AstSpan::line(&instruction.span.file, instruction.span.start_line + line_offset),
                involved_accounts: vec![InvolvedAccount { name: account_name.clone(), constraints: Vec::new() }],
                reason: format!(
                    "native instruction deserializes `{account_name}` with no account.owner check within {NATIVE_OWNER_CHECK_WINDOW} lines or anywhere else in its body"
                ),
                sink_id: None,
                fingerprint: VulnCandidate::compute_fingerprint(
                    VulnClass::MissingOwner,
                    &instruction.name,
                    &instruction.span.file,
                    instruction.span.start_line + line_offset,
                    std::slice::from_ref(&account_name),
                ),
                excerpt: line.trim().to_string(),
                source: CandidateSource::ClassDetector("native_missing_owner"),
            });
        }
    }
}

fn reload_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.reload\s*\(\s*\)|try_from_slice|try_deserialize").unwrap())
}

/// Post-CPI read window bound (§4.5 "examine the next 30 lines"), applied
/// regardless of where the next CPI in the same instruction falls.
const STALE_POST_CPI_WINDOW: usize = 30;

/// Flags a CPI followed, within the next 30 lines of the instruction body
/// (or up to the next CPI if that comes sooner), by a read of mutable
/// account data (a comparison or arithmetic use of a field already in
/// scope) with no intervening `.reload()`/re-deserialization call — the
/// account's in-memory copy can be stale relative to what the callee just
/// wrote (§1 "stale reads after CPI"). At most one finding per
/// instruction: the first qualifying CPI is the one worth fixing.
fn stale_post_cpi(graph: &FactGraph, out: &mut Vec<VulnCandidate>) {
    for instruction in graph.instructions.values() {
        let mut cpis = graph.cpis_of(&instruction.id);
        if cpis.is_empty() {
            continue;
        }
        cpis.sort_by_key(|c| c.span.start_line);

        let lines: Vec<&str> = instruction.body_excerpt.lines().collect();
        for (idx, cpi) in cpis.iter().enumerate() {
            let window_start = cpi.span.start_line.saturating_sub(instruction.span.start_line) + 1;
            let next_cpi_line = cpis
                .get(idx + 1)
                .map(|next| next.span.start_line.saturating_sub(instruction.span.start_line))
                .unwrap_or(lines.len());
            let window_end = next_cpi_line.min(window_start + STALE_POST_CPI_WINDOW).min(lines.len());
            if window_start >= window_end {
                continue;
            }

            let window = lines[window_start..window_end].join("\n");
            if reload_re().is_match(&window) {
                continue;
            }
            let reads_state = window.contains(".amount")
                || window.contains(".balance")
                || window.contains(".supply")
                || window.contains("ctx.accounts.");
            if !reads_state {
                continue;
            }

            out.push(VulnCandidate {
                id: String::new(),
                vuln_class: VulnClass::StalePostCpi,
                severity: Severity::High,
                confidence: 0.5,
                instruction: instruction.id.clone(),
                span: cpi.span.clone(),
                involved_accounts: Vec::new(),
                reason: "account state is read after a CPI with no .reload()/re-deserialization in between".to_string(),
                sink_id: None,
                fingerprint: VulnCandidate::compute_fingerprint(
                    VulnClass::StalePostCpi,
                    &instruction.name,
                    &cpi.span.file,
                    cpi.span.start_line,
                    &[],
                ),
                excerpt: window.lines().next().unwrap_or("").trim().to_string(),
                source: CandidateSource::ClassDetector("stale_post_cpi"),
            });
            break;
        }
    }
}

/// Flags manual account deserialization (`try_from_slice`,
/// `try_deserialize`) with no discriminator/type-tag comparison
/// immediately after — a classic type-confusion entry point where an
/// attacker substitutes an account of a different type but identical
/// byte layout prefix (§1 "type confusion").
fn type_confusion(graph: &FactGraph, out: &mut Vec<VulnCandidate>) {
    static DESERIALIZE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DESERIALIZE_RE
        .get_or_init(|| Regex::new(r"(\w+)\s*::\s*try_from_slice\s*\(|(\w+)\.try_deserialize\s*(?:::<\w+>)?\s*\(").unwrap());

    for instruction in graph.instructions.values() {
        let lines: Vec<&str> = instruction.body_excerpt.lines().collect();
        for (offset, line) in lines.iter().enumerate() {
            if !re.is_match(line) {
                continue;
            }
            let window_end = (offset + 3).min(lines.len());
            let window = lines[offset..window_end].join("\n");
            let has_discriminator_check = window.contains("discriminator")
                || window.contains("DISCRIMINATOR")
                || window.contains("account_type")
                || window.contains("AccountType");
            if has_discriminator_check {
                continue;
            }

            let line_no = instruction.span.start_line + offset;
            out.push(VulnCandidate {
                id: String::new(),
                vuln_class: VulnClass::TypeConfusion,
                severity: Severity::High,
                confidence: 0.45,
                instruction: instruction.id.clone(),
                span: AstSpan::line(&instruction.span.file, line_no),
                involved_accounts: Vec::new(),
                reason: "manual account deserialization with no discriminator/type-tag check".to_string(),
                sink_id: None,
                fingerprint: VulnCandidate::compute_fingerprint(
                    VulnClass::TypeConfusion,
                    &instruction.name,
                    &instruction.span.file,
                    line_no,
                    &[],
                ),
                excerpt: line.trim().to_string(),
                source: CandidateSource::ClassDetector("type_confusion"),
            });
        }
    }
}

/// Flags a status/state field that is both read in a comparison and
/// written to a new value within the same instruction body, with no
/// `require!`/`if`-guarded transition check between the read and the
/// write — the instruction can drive the account through an
/// unvalidated state transition (§1 "state machine violation"; this
/// class is only ever produced here, never by the structural generator,
/// since recognizing a *transition* needs a read-then-write pair rather
/// than a single sink).
fn state_machine_violation(graph: &FactGraph, out: &mut Vec<VulnCandidate>) {
    static STATE_FIELD_RE: OnceLock<Regex> = OnceLock::new();
    let field_re = STATE_FIELD_RE.get_or_init(|| {
        Regex::new(r"\.(status|state|phase)\s*=\s*[A-Za-z_:]+").unwrap()
    });
    static STATE_READ_RE: OnceLock<Regex> = OnceLock::new();
    let read_re = STATE_READ_RE
        .get_or_init(|| Regex::new(r"\.(status|state|phase)\s*(==|!=)").unwrap());

    for instruction in graph.instructions.values() {
        let body = &instruction.body_excerpt;
        let Some(write_caps) = field_re.captures(body) else {
            continue;
        };
        let field = write_caps.get(1).map(|m| m.as_str()).unwrap_or("state");

        let has_read_check = read_re.captures(body).is_some_and(|c| c.get(1).map(|m| m.as_str()) == Some(field));
        let has_require_guard = body.contains("require!") && body.contains(field);
        if has_read_check || has_require_guard {
            continue;
        }

        out.push(VulnCandidate {
            id: String::new(),
            vuln_class: VulnClass::StateMachineViolation,
            severity: Severity::Medium,
            confidence: 0.4,
            instruction: instruction.id.clone(),
            span: instruction.span.clone(),
            involved_accounts: Vec::new(),
            reason: format!(
                "'{field}' is written with no prior check constraining which states can transition here"
            ),
            sink_id: None,
            fingerprint: VulnCandidate::compute_fingerprint(
                VulnClass::StateMachineViolation,
                &instruction.name,
                &instruction.span.file,
                instruction.span.start_line,
                &[],
            ),
            excerpt: write_caps.get(0).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
            source: CandidateSource::ClassDetector("state_machine_violation"),
        });
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
    fn oracle_without_staleness_check_is_flagged() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod consumer {
                use super::*;
                pub fn liquidate(ctx: Context<Liquidate>) -> Result<()> {
                    let price = oracle.get_price()?;
                    let value = amount * price;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Liquidate<'info> {
                pub authority: Signer<'info>,
            }
        "#;
        let graph = graph_from_source(source);
        let found = run_all(&graph);
        assert!(found.iter().any(|c| matches!(c.vuln_class, VulnClass::OracleValidation)));
    }

    #[test]
    fn oracle_with_staleness_check_is_not_flagged() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod consumer {
                use super::*;
                pub fn liquidate(ctx: Context<Liquidate>) -> Result<()> {
                    let price = oracle.get_price()?;
                    require!(clock.slot - price.publish_slot < MAX_AGE, ErrorCode::Stale);
                    let value = amount * price.value;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Liquidate<'info> {
                pub authority: Signer<'info>,
            }
        "#;
        let graph = graph_from_source(source);
        let found = run_all(&graph);
        assert!(!found.iter().any(|c| matches!(c.vuln_class, VulnClass::OracleValidation)));
    }

    #[test]
    fn oracle_confidence_check_suppresses_finding() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod consumer {
                use super::*;
                pub fn liquidate(ctx: Context<Liquidate>) -> Result<()> {
                    let price = oracle.get_price()?;
                    require!(price.confidence < MAX_CONF, ErrorCode::LowConfidence);
                    let value = amount * price.value;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Liquidate<'info> {
                pub authority: Signer<'info>,
            }
        "#;
        let graph = graph_from_source(source);
        let found = run_all(&graph);
        assert!(!found.iter().any(|c| matches!(c.vuln_class, VulnClass::OracleValidation)));
    }

    #[test]
    fn oracle_without_any_guard_is_critical() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod consumer {
                use super::*;
                pub fn liquidate(ctx: Context<Liquidate>) -> Result<()> {
                    let price = oracle.get_price()?;
                    let value = amount * price;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Liquidate<'info> {
                pub authority: Signer<'info>,
            }
        "#;
        let graph = graph_from_source(source);
        let found = run_all(&graph);
        let finding = found
            .iter()
            .find(|c| matches!(c.vuln_class, VulnClass::OracleValidation))
            .expect("oracle finding");
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn oracle_with_unrelated_guard_is_high_not_critical() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod consumer {
                use super::*;
                pub fn liquidate(ctx: Context<Liquidate>) -> Result<()> {
                    require!(amount > 0, ErrorCode::ZeroAmount);
                    let price = oracle.get_price()?;
                    let value = amount * price;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Liquidate<'info> {
                pub authority: Signer<'info>,
            }
        "#;
        let graph = graph_from_source(source);
        let found = run_all(&graph);
        let finding = found
            .iter()
            .find(|c| matches!(c.vuln_class, VulnClass::OracleValidation))
            .expect("oracle finding");
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn stale_read_within_window_is_flagged() {
        let mut source = String::from(
            r#"
            use anchor_lang::prelude::*;
            use anchor_lang::solana_program::program;

            #[program]
            pub mod vault {
                use super::*;
                pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
                    program::invoke(&ix, &[ctx.accounts.token_program.clone()])?;
"#,
        );
        for i in 0..5 {
            source.push_str(&format!("                    msg!(\"filler {i}\");\n"));
        }
        source.push_str(
            r#"
                    let balance = ctx.accounts.vault.amount;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Withdraw<'info> {
                #[account(mut)]
                pub vault: AccountInfo<'info>,
                pub token_program: AccountInfo<'info>,
            }
        "#,
        );
        let graph = graph_from_source(&source);
        let found = run_all(&graph);
        assert!(found.iter().any(|c| matches!(c.vuln_class, VulnClass::StalePostCpi)));
    }

    #[test]
    fn stale_read_beyond_thirty_line_window_is_not_flagged() {
        let mut source = String::from(
            r#"
            use anchor_lang::prelude::*;
            use anchor_lang::solana_program::program;

            #[program]
            pub mod vault {
                use super::*;
                pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
                    program::invoke(&ix, &[ctx.accounts.token_program.clone()])?;
"#,
        );
        for i in 0..40 {
            source.push_str(&format!("                    msg!(\"filler {i}\");\n"));
        }
        source.push_str(
            r#"
                    let balance = ctx.accounts.vault.amount;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Withdraw<'info> {
                #[account(mut)]
                pub vault: AccountInfo<'info>,
                pub token_program: AccountInfo<'info>,
            }
        "#,
        );
        let graph = graph_from_source(&source);
        let found = run_all(&graph);
        assert!(!found.iter().any(|c| matches!(c.vuln_class, VulnClass::StalePostCpi)));
    }

    #[test]
    fn only_one_stale_post_cpi_finding_per_instruction() {
        let source = r#"
            use anchor_lang::prelude::*;
            use anchor_lang::solana_program::program;

            #[program]
            pub mod vault {
                use super::*;
                pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
                    program::invoke(&ix, &[ctx.accounts.token_program.clone()])?;
                    let balance = ctx.accounts.vault.amount;
                    program::invoke(&ix2, &[ctx.accounts.token_program.clone()])?;
                    let balance2 = ctx.accounts.vault.amount;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Withdraw<'info> {
                #[account(mut)]
                pub vault: AccountInfo<'info>,
                pub token_program: AccountInfo<'info>,
            }
        "#;
        let graph = graph_from_source(source);
        let found: Vec<_> = run_all(&graph)
            .into_iter()
            .filter(|c| matches!(c.vuln_class, VulnClass::StalePostCpi))
            .collect();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn native_missing_owner_fires_for_a_recovered_native_handler() {
        let source = r#"
            use solana_program::account_info::{next_account_info, AccountInfo};
            use solana_program::entrypoint::ProgramResult;
            use solana_program::pubkey::Pubkey;

            pub fn process_instruction(
                program_id: &Pubkey,
                accounts: &[AccountInfo],
                instruction_data: &[u8],
            ) -> ProgramResult {
                let instruction = CashInstruction::unpack(instruction_data)?;
                match instruction {
                    CashInstruction::PrintCash { amount } => process_print_cash(accounts, amount),
                }
            }

            fn process_print_cash(accounts: &[AccountInfo], amount: u64) -> ProgramResult {
                let account_info_iter = &mut accounts.iter();
                let mint_info = next_account_info(account_info_iter)?;
                let vault_info = next_account_info(account_info_iter)?;
                let vault = Account::unpack(&vault_info.data.borrow())?;
                **vault_info.try_borrow_mut_lamports()? += amount;
                Ok(())
            }
        "#;
        let graph = graph_from_source(source);
        assert_eq!(graph.program.as_ref().map(|p| p.framework), Some(Framework::Native));
        let found = run_all(&graph);
        assert!(found.iter().any(|c| matches!(c.vuln_class, VulnClass::MissingOwner)));
    }

    #[test]
    fn state_write_without_guard_is_flagged() {
        let source = r#"
            use anchor_lang::prelude::*;

            #[program]
            pub mod escrow {
                use super::*;
                pub fn settle(ctx: Context<Settle>) -> Result<()> {
                    ctx.accounts.deal.status = DealStatus::Settled;
                    Ok(())
                }
            }

            #[derive(Accounts)]
            pub struct Settle<'info> {
                pub authority: Signer<'info>,
                #[account(mut)]
                pub deal: Account<'info, Deal>,
            }
        "#;
        let graph = graph_from_source(source);
        let found = run_all(&graph);
        assert!(found.iter().any(|c| matches!(c.vuln_class, VulnClass::StateMachineViolation)));
    }
}
