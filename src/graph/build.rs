//! Fact Graph construction from ingested source files (§4.2).
//!
//! This is the one place in the crate that turns parsed
//! [`AnalysisContext`]s into graph nodes. It leans on textual scanning
//! over instruction body line ranges for sinks, guards, PDAs, and CPIs —
//! the same style the legacy detectors in [`crate::detectors`] use —
//! rather than tracking `syn` spans, because this crate's AST is parsed
//! without retaining reliable line/column info per node.

use super::*;
use crate::error::Diagnostics;
use crate::ingest::IngestedFile;
use crate::parser::{
    AccountField, AccountStruct, AccountType, AnalysisContext, Constraint, InstructionHandler,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Builds the Fact Graph for one program from its ingested source files.
///
/// Per-file parse failures are captured as [`crate::error::ScanError::ParseWarning`]
/// entries in `diagnostics` and the offending file is skipped; the scan
/// proceeds with whatever parsed successfully (§4.2 "Failure semantics").
pub fn build(files: &[IngestedFile], diagnostics: &mut Diagnostics) -> FactGraph {
    let mut contexts = Vec::with_capacity(files.len());
    for file in files {
        match AnalysisContext::from_source(&file.path, file.content.clone()) {
            Ok(ctx) => contexts.push(ctx),
            Err(e) => diagnostics.push_parse_warning(&file.path, e),
        }
    }

    let mut graph = FactGraph {
        program: Some(build_program_node(files, &contexts)),
        ..Default::default()
    };

    for ctx in &contexts {
        index_struct_fields(&mut graph, ctx);
        for instruction in &ctx.instructions {
            build_instruction(&mut graph, ctx, instruction);
        }
    }

    if matches!(graph.program.as_ref().map(|p| p.framework), Some(Framework::Native)) {
        for ctx in &contexts {
            collect_native_dispatch_aliases(&mut graph, ctx);
        }
    }

    compute_sink_neighborhoods(&mut graph);
    graph
}

fn build_program_node(files: &[IngestedFile], contexts: &[AnalysisContext]) -> ProgramNode {
    let name = contexts.iter().find_map(|c| c.program_name.clone());
    let address = contexts.iter().find_map(|c| c.program_id.clone());

    // Deliberately not keyed on `!c.accounts.is_empty()`: native programs
    // now get a synthetic accounts struct per recovered handler (§4.2
    // "Native path"), so that alone would misclassify them as Anchor.
    let is_anchor = contexts.iter().any(|c| {
        c.program_name.is_some()
            || c.source_code.contains("anchor_lang")
            || c.source_code.contains("#[program]")
            || c.source_code.contains("derive(Accounts)")
    });
    let is_native = !is_anchor
        && contexts
            .iter()
            .any(|c| c.source_code.contains("solana_program") || c.source_code.contains("process_instruction"));

    let framework = if is_anchor {
        Framework::Anchor
    } else if is_native {
        Framework::Native
    } else {
        Framework::Unknown
    };

    let file_records = files
        .iter()
        .map(|f| FileRecord {
            path: f.path.clone(),
            line_count: f.line_count,
            content_hash: f.content_hash,
        })
        .collect();

    ProgramNode {
        name,
        address,
        framework,
        files: file_records,
    }
}

fn index_struct_fields(graph: &mut FactGraph, ctx: &AnalysisContext) {
    for account_struct in &ctx.accounts {
        let entry = graph
            .struct_fields
            .entry(account_struct.name.clone())
            .or_default();
        for field in &account_struct.fields {
            entry.push(StableId::account(&ctx.file_path, &account_struct.name, &field.name));
        }
    }
}

fn find_account_struct<'a>(ctx: &'a AnalysisContext, name: &str) -> Option<&'a AccountStruct> {
    ctx.accounts.iter().find(|s| s.name == name)
}

/// Locates the `{ ... }` body of a named function by brace counting from
/// its first textual occurrence, since spans are unavailable (see module docs).
fn find_function_body_lines(source: &str, fn_name: &str) -> Option<(usize, usize)> {
    let lines: Vec<&str> = source.lines().collect();
    let needle = format!("fn {fn_name}");
    let start_idx = lines.iter().position(|l| l.contains(&needle))?;

    let mut depth = 0i32;
    let mut seen_open = false;
    for (i, line) in lines.iter().enumerate().skip(start_idx) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return Some((start_idx + 1, i + 1));
        }
    }
    Some((start_idx + 1, lines.len()))
}

fn build_instruction(graph: &mut FactGraph, ctx: &AnalysisContext, instr: &InstructionHandler) {
    let file = ctx.file_path.as_str();
    let id = StableId::instruction(file, &instr.name);

    let (start_line, end_line) = find_function_body_lines(&ctx.source_code, &instr.name)
        .unwrap_or((1, ctx.source_code.lines().count().max(1)));
    let body_excerpt = ctx.get_source_range(start_line, end_line.min(start_line + 60));

    let accounts_struct = if instr.accounts_type.is_empty() {
        None
    } else {
        Some(instr.accounts_type.clone())
    };

    let mut account_ids = Vec::new();
    let mut required_signers = Vec::new();

    if let Some(struct_name) = &accounts_struct {
        if let Some(account_struct) = find_account_struct(ctx, struct_name) {
            for field in &account_struct.fields {
                let field_id = build_account_node(graph, file, &id, &instr.name, field);
                if field.is_signer || matches!(field.ty, AccountType::Signer) {
                    required_signers.push(field.name.clone());
                }
                account_ids.push(field_id);
            }
        }
    }

    let called_functions = extract_called_function_names(&body_excerpt);
    let visibility = if ctx
        .source_code
        .lines()
        .nth(start_line.saturating_sub(1))
        .map_or(true, |l| l.trim_start().starts_with("pub "))
    {
        Visibility::Public
    } else {
        Visibility::Gated
    };

    let instruction_node = InstructionNode {
        id: id.clone(),
        name: instr.name.clone(),
        accounts_struct,
        account_ids,
        sink_ids: Vec::new(),
        guard_ids: Vec::new(),
        visibility,
        required_signers,
        parameters: instr.args.iter().map(|a| (a.name.clone(), a.ty.clone())).collect(),
        called_functions,
        body_excerpt,
        span: AstSpan::range(file, start_line, end_line),
    };

    graph.instructions.insert(id.clone(), instruction_node);
    graph.instruction_order.push(id.clone());

    let sink_ids = build_sinks(graph, ctx, &id, &instr.name, start_line, end_line);
    let guard_ids = build_guards(graph, ctx, &id, &instr.name, start_line, end_line);
    build_pdas(graph, ctx, &id, &instr.name, &accounts_struct.clone().unwrap_or_default(), start_line);
    build_cpis(graph, ctx, &id, &instr.name, start_line, end_line);

    if let Some(node) = graph.instructions.get_mut(&id) {
        node.sink_ids = sink_ids;
        node.guard_ids = guard_ids;
    }
}

fn build_account_node(
    graph: &mut FactGraph,
    file: &str,
    instruction_id: &StableId,
    instruction_name: &str,
    field: &AccountField,
) -> StableId {
    let id = StableId::account(file, instruction_name, &field.name);
    let constraints: Vec<ConstraintKind> = field
        .constraints
        .iter()
        .map(|c| (&c.constraint_type).into())
        .collect();
    let pda = if constraints
        .iter()
        .any(|c| matches!(c, ConstraintKind::Seeds(_)))
    {
        Some(StableId::pda(file, instruction_name, field.line))
    } else {
        None
    };

    let node = AccountNode {
        id: id.clone(),
        name: field.name.clone(),
        instruction: instruction_id.clone(),
        wrapper: (&field.ty).into(),
        raw_type: format!("{:?}", field.ty),
        is_signer: field.is_signer || matches!(field.ty, AccountType::Signer),
        is_mut: field.is_mutable,
        constraints,
        pda,
        span: AstSpan::line(file, field.line.max(1)),
    };

    graph.accounts.insert(id.clone(), node);
    id
}

fn extract_called_function_names(body: &str) -> Vec<String> {
    static CALL_RE: OnceLock<Regex> = OnceLock::new();
    let re = CALL_RE.get_or_init(|| Regex::new(r"\b([a-z_][a-z0-9_]*)\s*\(").unwrap());
    const KEYWORDS: &[&str] = &[
        "if", "match", "while", "for", "return", "let", "require", "msg", "some", "ok", "err",
    ];

    let mut names = Vec::new();
    for caps in re.captures_iter(body) {
        let name = caps[1].to_string();
        if KEYWORDS.contains(&name.as_str()) || names.contains(&name) {
            continue;
        }
        names.push(name);
        if names.len() >= 20 {
            break;
        }
    }
    names
}

struct SinkRule {
    kind: SinkKind,
    regex: Regex,
}

fn sink_rules() -> &'static [SinkRule] {
    static RULES: OnceLock<Vec<SinkRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let specs: &[(SinkKind, &str)] = &[
            (SinkKind::TokenTransfer, r"token::transfer|Transfer\s*\{"),
            (SinkKind::TokenMintTo, r"token::mint_to|MintTo\s*\{"),
            (SinkKind::TokenBurn, r"token::burn|Burn\s*\{"),
            (SinkKind::TokenApprove, r"token::approve\b|Approve\s*\{"),
            (SinkKind::TokenRevoke, r"token::revoke\b|Revoke\s*\{"),
            (SinkKind::SetAuthority, r"token::set_authority|SetAuthority"),
            (SinkKind::CloseAccount, r"token::close_account|CloseAccount"),
            (SinkKind::SystemTransfer, r"system_program::transfer|system_instruction::transfer"),
            (SinkKind::InvokeSigned, r"invoke_signed\s*\("),
            (SinkKind::Invoke, r"(?:^|[^_])\binvoke\s*\("),
            (SinkKind::AccountRealloc, r"\.realloc\s*\("),
            (SinkKind::SysvarInstructionsRead, r"sysvar::instructions|load_instruction_at|Instructions::"),
            (SinkKind::OracleRead, r"get_price|\b\w*(?:oracle|pyth|switchboard|aggregator)\w*\s*\."),
        ];
        specs
            .iter()
            .map(|(kind, pattern)| SinkRule { kind: *kind, regex: Regex::new(pattern).expect("static sink pattern is valid regex") })
            .collect()
    })
}

fn account_names_in_line(line: &str) -> Vec<String> {
    static ACCOUNTS_RE: OnceLock<Regex> = OnceLock::new();
    let re = ACCOUNTS_RE.get_or_init(|| Regex::new(r"ctx\.accounts\.(\w+)|accounts\.(\w+)").unwrap());
    re.captures_iter(line)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string()))
        .collect()
}

fn build_sinks(
    graph: &mut FactGraph,
    ctx: &AnalysisContext,
    instruction_id: &StableId,
    instruction_name: &str,
    start_line: usize,
    end_line: usize,
) -> Vec<StableId> {
    let file = ctx.file_path.as_str();
    let mut ids = Vec::new();
    let lines: Vec<&str> = ctx.source_code.lines().collect();

    // Manual lamport-drain closes are their own sink kind, distinct from
    // the generic lamport_mutation pattern below (§3 Sink kinds list).
    static DRAIN_RE: OnceLock<Regex> = OnceLock::new();
    let drain_re = DRAIN_RE
        .get_or_init(|| Regex::new(r"\*\*.*try_borrow_mut_lamports\(\)\?\s*-=").unwrap());
    static MUTATE_RE: OnceLock<Regex> = OnceLock::new();
    let mutate_re = MUTATE_RE
        .get_or_init(|| Regex::new(r"\*\*.*try_borrow_mut_lamports\(\)\?\s*(\+=|=)").unwrap());

    for line_no in start_line..=end_line.min(lines.len()) {
        let Some(line) = lines.get(line_no - 1) else { continue };

        if drain_re.is_match(line) {
            ids.push(push_sink(graph, file, instruction_id, instruction_name, SinkKind::AccountClose, line_no, line));
            continue;
        }
        if mutate_re.is_match(line) {
            ids.push(push_sink(graph, file, instruction_id, instruction_name, SinkKind::LamportMutation, line_no, line));
        }

        for rule in sink_rules() {
            if rule.regex.is_match(line) {
                ids.push(push_sink(graph, file, instruction_id, instruction_name, rule.kind, line_no, line));
            }
        }
    }

    ids
}

fn push_sink(
    graph: &mut FactGraph,
    file: &str,
    instruction_id: &StableId,
    instruction_name: &str,
    kind: SinkKind,
    line_no: usize,
    line: &str,
) -> StableId {
    let kind_tag = format!("{kind:?}");
    let id = StableId::sink(file, instruction_name, &kind_tag, line_no);
    let node = SinkNode {
        id: id.clone(),
        kind,
        instruction: instruction_id.clone(),
        accounts: account_names_in_line(line),
        excerpt: line.trim().to_string(),
        span: AstSpan::line(file, line_no),
    };
    graph.sinks.insert(id.clone(), node);
    id
}

fn build_guards(
    graph: &mut FactGraph,
    ctx: &AnalysisContext,
    instruction_id: &StableId,
    instruction_name: &str,
    start_line: usize,
    end_line: usize,
) -> Vec<StableId> {
    let file = ctx.file_path.as_str();
    let mut ids = Vec::new();

    if let Some(struct_name) = graph
        .instructions
        .get(instruction_id)
        .and_then(|i| i.accounts_struct.clone())
    {
        if let Some(account_struct) = find_account_struct(ctx, &struct_name) {
            for field in &account_struct.fields {
                for constraint in &field.constraints {
                    if is_guard_constraint(constraint) {
                        let kind = GuardKind::Constraint((&constraint.constraint_type).into());
                        let id = StableId::guard(file, instruction_name, &field.name, constraint.line.max(1));
                        graph.guards.insert(
                            id.clone(),
                            GuardNode { id: id.clone(), kind, protects: field.name.clone(), span: AstSpan::line(file, constraint.line.max(1)) },
                        );
                        ids.push(id);
                    }
                }
            }
        }
    }

    static REQUIRE_RE: OnceLock<Regex> = OnceLock::new();
    let require_re = REQUIRE_RE.get_or_init(|| Regex::new(r"(require!|require_eq!|require_neq!|require_keys_eq!)\s*\(\s*([^,\)]+)").unwrap());
    static ASSERT_RE: OnceLock<Regex> = OnceLock::new();
    let assert_re = ASSERT_RE.get_or_init(|| Regex::new(r"assert(?:_eq)?!\s*\(\s*([^,\)]+)").unwrap());

    let lines: Vec<&str> = ctx.source_code.lines().collect();
    for line_no in start_line..=end_line.min(lines.len()) {
        let Some(line) = lines.get(line_no - 1) else { continue };

        if let Some(caps) = require_re.captures(line) {
            let expr = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            let id = StableId::guard(file, instruction_name, "require", line_no);
            graph.guards.insert(id.clone(), GuardNode { id: id.clone(), kind: GuardKind::Require(line.trim().to_string()), protects: expr, span: AstSpan::line(file, line_no) });
            ids.push(id);
        } else if let Some(caps) = assert_re.captures(line) {
            let expr = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            let id = StableId::guard(file, instruction_name, "assert", line_no);
            graph.guards.insert(id.clone(), GuardNode { id: id.clone(), kind: GuardKind::Assert(line.trim().to_string()), protects: expr, span: AstSpan::line(file, line_no) });
            ids.push(id);
        } else if line.trim_start().starts_with("if ") && (line.contains("is_signer") || line.contains(".key()")) {
            let id = StableId::guard(file, instruction_name, "if", line_no);
            graph.guards.insert(id.clone(), GuardNode { id: id.clone(), kind: GuardKind::IfCondition(line.trim().to_string()), protects: String::new(), span: AstSpan::line(file, line_no) });
            ids.push(id);
        }
    }

    ids
}

fn is_guard_constraint(constraint: &Constraint) -> bool {
    use crate::parser::ConstraintType;
    matches!(
        constraint.constraint_type,
        ConstraintType::Signer
            | ConstraintType::Owner(_)
            | ConstraintType::HasOne(_)
            | ConstraintType::Address(_)
            | ConstraintType::Constraint(_)
            | ConstraintType::Seeds(_)
            | ConstraintType::TokenAuthority(_)
            | ConstraintType::TokenMint(_)
    )
}

fn build_pdas(
    graph: &mut FactGraph,
    ctx: &AnalysisContext,
    instruction_id: &StableId,
    instruction_name: &str,
    accounts_struct: &str,
    start_line: usize,
) {
    let file = ctx.file_path.as_str();

    if let Some(account_struct) = find_account_struct(ctx, accounts_struct) {
        for field in &account_struct.fields {
            let Some(seeds_constraint) = field
                .constraints
                .iter()
                .find(|c| matches!(c.constraint_type, crate::parser::ConstraintType::Seeds(_)))
            else {
                continue;
            };
            let crate::parser::ConstraintType::Seeds(seeds) = &seeds_constraint.constraint_type else {
                unreachable!()
            };
            let has_bump = field
                .constraints
                .iter()
                .any(|c| matches!(c.constraint_type, crate::parser::ConstraintType::Bump));

            let bump_source = if has_bump {
                BumpSource::Canonical
            } else {
                BumpSource::Unknown
            };

            let seed_exprs = seeds
                .iter()
                .map(|s| SeedExpr {
                    attacker_controlled: seed_is_attacker_controlled(s, account_struct),
                    text: s.clone(),
                })
                .collect();

            let id = StableId::pda(file, instruction_name, seeds_constraint.line.max(1));
            graph.pdas.insert(
                id,
                PdaNode {
                    id: StableId::pda(file, instruction_name, seeds_constraint.line.max(1)),
                    seeds: seed_exprs,
                    bump_source,
                    source: PdaSource::Constraint,
                    instruction: instruction_id.clone(),
                    span: AstSpan::line(file, seeds_constraint.line.max(1)),
                },
            );
        }
    }

    static INLINE_PDA_RE: OnceLock<Regex> = OnceLock::new();
    let inline_re = INLINE_PDA_RE.get_or_init(|| {
        Regex::new(r"(?:create_program_address|find_program_address)\s*\(\s*&\[([^\]]*)\]\s*,\s*(?:&\[(\w+)\]\s*,\s*)?").unwrap()
    });

    for (idx, line) in ctx.source_code.lines().enumerate() {
        let line_no = idx + 1;
        if line_no < start_line {
            continue;
        }
        let Some(caps) = inline_re.captures(line) else { continue };
        let seeds_text = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let bump_var = caps.get(2).map(|m| m.as_str());

        let bump_source = match bump_var {
            Some(v) if v == "bump" => BumpSource::UserProvided,
            Some(_) => BumpSource::Stored,
            None if line.contains("find_program_address") => BumpSource::Canonical,
            None => BumpSource::Unknown,
        };

        let seed_exprs: Vec<SeedExpr> = seeds_text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|text| SeedExpr { attacker_controlled: false, text })
            .collect();

        let id = StableId::pda(file, instruction_name, line_no);
        graph.pdas.insert(
            id.clone(),
            PdaNode { id, seeds: seed_exprs, bump_source, source: PdaSource::Inline, instruction: instruction_id.clone(), span: AstSpan::line(file, line_no) },
        );
    }
}

fn seed_is_attacker_controlled(seed_text: &str, account_struct: &AccountStruct) -> bool {
    account_struct
        .fields
        .iter()
        .any(|f| seed_text.contains(&f.name) && !f.is_signer)
}

fn build_cpis(
    graph: &mut FactGraph,
    ctx: &AnalysisContext,
    instruction_id: &StableId,
    instruction_name: &str,
    start_line: usize,
    end_line: usize,
) {
    let file = ctx.file_path.as_str();
    let lines: Vec<&str> = ctx.source_code.lines().collect();

    static INVOKE_RE: OnceLock<Regex> = OnceLock::new();
    let invoke_re = INVOKE_RE.get_or_init(|| Regex::new(r"\binvoke(_signed)?\s*\(").unwrap());
    static PROGRAM_TYPE_RE: OnceLock<Regex> = OnceLock::new();
    let program_type_re = PROGRAM_TYPE_RE.get_or_init(|| Regex::new(r"Program<'info,\s*(\w+)>").unwrap());

    let typed_programs: Vec<String> = find_account_struct(
        ctx,
        graph
            .instructions
            .get(instruction_id)
            .and_then(|i| i.accounts_struct.as_deref())
            .unwrap_or(""),
    )
    .map(|s| {
        s.fields
            .iter()
            .filter(|f| matches!(f.ty, AccountType::Program(_)))
            .map(|f| f.name.clone())
            .collect()
    })
    .unwrap_or_default();

    for line_no in start_line..=end_line.min(lines.len()) {
        let Some(line) = lines.get(line_no - 1) else { continue };
        let Some(caps) = invoke_re.captures(line) else { continue };

        let call_type = if caps.get(1).is_some() {
            CpiCallType::InvokeSigned
        } else {
            CpiCallType::Invoke
        };

        let window_end = (line_no + 5).min(lines.len());
        let window = lines[line_no.saturating_sub(1)..window_end].join("\n");

        let program_validated = program_type_re.is_match(&window)
            || typed_programs.iter().any(|p| window.contains(p))
            || window.contains(".key() ==")
            || window.contains("check_id(");

        let target = if program_validated {
            program_type_re
                .captures(&window)
                .and_then(|c| c.get(1))
                .map(|m| CpiTarget::Known(m.as_str().to_string()))
                .unwrap_or(CpiTarget::Known("validated".to_string()))
        } else {
            CpiTarget::Dynamic
        };

        let signer_seeds = if matches!(call_type, CpiCallType::InvokeSigned) {
            static SEEDS_ARG_RE: OnceLock<Regex> = OnceLock::new();
            let re = SEEDS_ARG_RE.get_or_init(|| Regex::new(r"&\[&\[([^\]]*)\]\]").unwrap());
            re.captures(&window)
                .map(|c| vec![c[1].to_string()])
        } else {
            None
        };

        let id = StableId::cpi(file, instruction_name, line_no);
        graph.cpis.insert(
            id.clone(),
            CpiNode {
                id,
                target,
                signer_seeds,
                account_metas: account_names_in_line(&window),
                call_type,
                program_validated,
                instruction: instruction_id.clone(),
                span: AstSpan::line(file, line_no),
            },
        );
    }
}

fn collect_native_dispatch_aliases(graph: &mut FactGraph, ctx: &AnalysisContext) {
    static DISPATCH_RE: OnceLock<Regex> = OnceLock::new();
    let re = DISPATCH_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:\w+::)?(\w+)\s*(?:\{[^}]*\}|\([^)]*\))?\s*=>\s*(?:Self::)?(\w+)\s*\(").unwrap()
    });

    for caps in re.captures_iter(&ctx.source_code) {
        let variant = caps[1].to_lowercase();
        let function = caps[2].to_lowercase();
        graph.native_dispatch_aliases.insert(function, variant);
    }
}

fn compute_sink_neighborhoods(graph: &mut FactGraph) {
    let sink_ids: Vec<StableId> = graph.sinks.keys().cloned().collect();
    for sink_id in sink_ids {
        let Some(sink) = graph.sinks.get(&sink_id) else { continue };
        let instruction_id = sink.instruction.clone();
        let accounts_involved = sink.accounts.clone();

        let guards_present: Vec<StableId> = graph
            .instructions
            .get(&instruction_id)
            .map(|i| {
                i.guard_ids
                    .iter()
                    .filter(|gid| {
                        graph.guards.get(*gid).is_some_and(|g| {
                            accounts_involved.iter().any(|a| g.protects.contains(a))
                                || accounts_involved.is_empty()
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let missing_guards = missing_guards_for(sink.kind, &guards_present);

        graph.sink_neighborhoods.insert(
            sink_id.clone(),
            SinkNeighborhood {
                sink: sink_id,
                instruction: instruction_id,
                accounts_involved,
                guards_present,
                taint_paths: Vec::new(),
                missing_guards,
            },
        );
    }
}

fn missing_guards_for(kind: SinkKind, guards_present: &[StableId]) -> Vec<String> {
    let needs_signer = matches!(
        kind,
        SinkKind::TokenTransfer
            | SinkKind::SolTransfer
            | SinkKind::TokenMintTo
            | SinkKind::TokenBurn
            | SinkKind::SetAuthority
            | SinkKind::AccountClose
    );
    if needs_signer && guards_present.is_empty() {
        vec!["signer-check-on-authority".to_string()]
    } else {
        Vec::new()
    }
}
