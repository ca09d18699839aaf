//! # Instruction Handler Parsing
//!
//! @title Instruction Handler Analyzer
//! @author Ramprasad
//!
//! This module extracts instruction handler functions from parsed AST and
//! analyzes their contents for arithmetic operations and CPI calls.
//!
//! ## Key Functions
//!
//! - [`extract_instruction_handlers`] - Extract all instruction handlers from AST

use super::*;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use syn::visit::Visit;
use syn::{Attribute, BinOp, Expr, ExprBinary, ExprCall, ExprMethodCall, File, ItemFn, Signature};

/// Extracts all instruction handlers from the AST.
///
/// Identifies functions that take a `Context<T>` parameter, which is the
/// standard signature for Anchor instruction handlers.
///
/// # Arguments
///
/// * `ast` - Parsed Rust syntax tree
///
/// # Returns
///
/// A vector of [`InstructionHandler`] instances.
pub fn extract_instruction_handlers(ast: &File) -> Vec<InstructionHandler> {
    let mut visitor = InstructionVisitor::new();
    visitor.visit_file(ast);
    visitor.handlers
}

/// AST visitor for instruction handler functions.
struct InstructionVisitor {
    handlers: Vec<InstructionHandler>,
}

impl InstructionVisitor {
    /// Creates a new visitor instance.
    fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Checks if a function has the `#[instruction]` attribute.
    ///
    /// # Arguments
    ///
    /// * `attrs` - Slice of attributes on the function
    ///
    /// # Returns
    ///
    /// `true` if the function has an instruction attribute.
    #[allow(dead_code)]
    fn is_instruction_handler(&self, attrs: &[Attribute]) -> bool {
        attrs.iter().any(|a| a.path().is_ident("instruction"))
    }

    /// Extracts the accounts type from a Context<T> parameter.
    ///
    /// Searches the function signature for a parameter with type `Context<T>`
    /// and extracts the generic parameter `T`.
    ///
    /// # Arguments
    ///
    /// * `sig` - The function signature
    ///
    /// # Returns
    ///
    /// The accounts type name if found, `None` otherwise.
    fn extract_accounts_type(&self, sig: &Signature) -> Option<String> {
        for input in &sig.inputs {
            if let syn::FnArg::Typed(pat_type) = input {
                let ty_str = quote::quote!(#pat_type.ty).to_string();
                if ty_str.contains("Context") {
                    if let syn::Type::Path(type_path) = &*pat_type.ty {
                        for seg in &type_path.path.segments {
                            if seg.ident == "Context" {
                                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                                    for arg in &args.args {
                                        if let syn::GenericArgument::Type(inner) = arg {
                                            return Some(quote::quote!(#inner).to_string());
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        None
    }

    /// Extracts instruction arguments from the function signature.
    ///
    /// Collects all typed parameters except for the Context parameter.
    ///
    /// # Arguments
    ///
    /// * `sig` - The function signature
    ///
    /// # Returns
    ///
    /// A vector of [`InstructionArg`] instances.
    fn extract_args(&self, sig: &Signature) -> Vec<InstructionArg> {
        let mut args = Vec::new();

        for input in &sig.inputs {
            if let syn::FnArg::Typed(pat_type) = input {
                let ty_str = quote::quote!(#pat_type.ty).to_string();

                // Skip Context parameter
                if ty_str.contains("Context") {
                    continue;
                }

                if let syn::Pat::Ident(pat_ident) = &*pat_type.pat {
                    args.push(InstructionArg {
                        name: pat_ident.ident.to_string(),
                        ty: ty_str.replace(' ', ""),
                    });
                }
            }
        }

        args
    }
}

impl<'ast> Visit<'ast> for InstructionVisitor {
    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        let accounts_type = self.extract_accounts_type(&node.sig);

        if accounts_type.is_some() {
            let mut analyzer = FunctionBodyAnalyzer::new();
            analyzer.visit_block(&node.block);

            self.handlers.push(InstructionHandler {
                name: node.sig.ident.to_string(),
                accounts_type: accounts_type.unwrap_or_default(),
                args: self.extract_args(&node.sig),
                start_line: 0,
                end_line: 0,
                arithmetic_ops: analyzer.arithmetic_ops,
                cpi_calls: analyzer.cpi_calls,
            });
        }

        syn::visit::visit_item_fn(self, node);
    }
}

/// Analyzer for function body contents.
///
/// Extracts arithmetic operations and CPI calls from instruction handler bodies.
struct FunctionBodyAnalyzer {
    arithmetic_ops: Vec<ArithmeticOp>,
    cpi_calls: Vec<CpiCall>,
}

impl FunctionBodyAnalyzer {
    /// Creates a new analyzer instance.
    fn new() -> Self {
        Self {
            arithmetic_ops: Vec::new(),
            cpi_calls: Vec::new(),
        }
    }

    /// Checks if a method name represents checked arithmetic.
    ///
    /// # Arguments
    ///
    /// * `method_name` - The method name to check
    ///
    /// # Returns
    ///
    /// `true` if the method is a checked or saturating arithmetic operation.
    fn is_checked_method(&self, method_name: &str) -> bool {
        matches!(
            method_name,
            "checked_add"
                | "checked_sub"
                | "checked_mul"
                | "checked_div"
                | "saturating_add"
                | "saturating_sub"
                | "saturating_mul"
        )
    }
}

impl<'ast> Visit<'ast> for FunctionBodyAnalyzer {
    fn visit_expr_binary(&mut self, node: &'ast ExprBinary) {
        let operation = match &node.op {
            BinOp::Add(_) => Some("add"),
            BinOp::Sub(_) => Some("sub"),
            BinOp::Mul(_) => Some("mul"),
            BinOp::Div(_) => Some("div"),
            _ => None,
        };

        if let Some(op) = operation {
            self.arithmetic_ops.push(ArithmeticOp {
                operation: op.to_string(),
                is_checked: false,
                line: 0,
                expression: quote::quote!(#node).to_string(),
            });
        }

        syn::visit::visit_expr_binary(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        let method_name = node.method.to_string();

        if self.is_checked_method(&method_name) {
            let op_type = if method_name.contains("add") {
                "add"
            } else if method_name.contains("sub") {
                "sub"
            } else if method_name.contains("mul") {
                "mul"
            } else {
                "div"
            };

            self.arithmetic_ops.push(ArithmeticOp {
                operation: op_type.to_string(),
                is_checked: true,
                line: 0,
                expression: quote::quote!(#node).to_string(),
            });
        }

        if method_name == "invoke" || method_name == "invoke_signed" {
            self.cpi_calls.push(CpiCall {
                program: "Unknown".to_string(),
                is_program_hardcoded: false,
                line: 0,
            });
        }

        syn::visit::visit_expr_method_call(self, node);
    }

    fn visit_expr_call(&mut self, node: &'ast ExprCall) {
        if let Expr::Path(path) = &*node.func {
            let path_str = quote::quote!(#path).to_string();
            if path_str.contains("invoke") {
                self.cpi_calls.push(CpiCall {
                    program: "Unknown".to_string(),
                    is_program_hardcoded: false,
                    line: 0,
                });
            }
        }

        syn::visit::visit_expr_call(self, node);
    }
}

/// Deterministic synthetic accounts-struct name for a native instruction
/// handler. Native programs have no `#[derive(Accounts)]` struct to bind
/// to, so the graph needs a stand-in name to key account nodes against.
pub fn native_accounts_struct_name(fn_name: &str) -> String {
    format!("Native::{fn_name}")
}

/// Lowercase dispatch match-arm variant name paired with the target
/// function called from that arm, e.g. `Variant::X { .. } =>
/// Self::process_x(...)` inside a native `process_instruction`'s `match`
/// over a decoded instruction enum (§4.2 "Native path").
fn native_dispatch_targets(source: &str) -> Vec<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:\w+::)?(\w+)\s*(?:\{[^}]*\}|\([^)]*\))?\s*=>\s*(?:Self::)?(\w+)\s*\(").unwrap()
    });
    re.captures_iter(source)
        .map(|c| (c[1].to_lowercase(), c[2].to_string()))
        .collect()
}

/// Extracts instruction handlers for a native (non-Anchor) program: every
/// function named on the RHS of a dispatch `match` arm becomes an
/// [`InstructionHandler`], with its args/arithmetic/CPIs recovered the
/// same way the Anchor path does (§4.2 "Native path").
pub fn extract_native_instruction_handlers(ast: &File, source: &str) -> Vec<InstructionHandler> {
    let targets = native_dispatch_targets(source);
    if targets.is_empty() {
        return Vec::new();
    }
    let target_names: HashSet<String> = targets.into_iter().map(|(_, function)| function).collect();

    let mut visitor = NativeInstructionVisitor { target_names, handlers: Vec::new() };
    visitor.visit_file(ast);
    visitor.handlers
}

struct NativeInstructionVisitor {
    target_names: HashSet<String>,
    handlers: Vec<InstructionHandler>,
}

impl<'ast> Visit<'ast> for NativeInstructionVisitor {
    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        let name = node.sig.ident.to_string();
        if self.target_names.contains(&name) {
            let mut analyzer = FunctionBodyAnalyzer::new();
            analyzer.visit_block(&node.block);

            let args = node
                .sig
                .inputs
                .iter()
                .filter_map(|input| {
                    let syn::FnArg::Typed(pat_type) = input else { return None };
                    let syn::Pat::Ident(pat_ident) = &*pat_type.pat else { return None };
                    Some(InstructionArg {
                        name: pat_ident.ident.to_string(),
                        ty: quote::quote!(#pat_type.ty).to_string().replace(' ', ""),
                    })
                })
                .collect();

            self.handlers.push(InstructionHandler {
                name: name.clone(),
                accounts_type: native_accounts_struct_name(&name),
                args,
                start_line: 0,
                end_line: 0,
                arithmetic_ops: analyzer.arithmetic_ops,
                cpi_calls: analyzer.cpi_calls,
            });
        }

        syn::visit::visit_item_fn(self, node);
    }
}

struct FnFinder<'ast> {
    name: String,
    found: Option<&'ast ItemFn>,
}

impl<'ast> Visit<'ast> for FnFinder<'ast> {
    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        if node.sig.ident == self.name {
            self.found = Some(node);
        }
        syn::visit::visit_item_fn(self, node);
    }
}

/// Recovers a synthetic accounts struct for each native instruction
/// handler by scanning its body for `next_account_info` bindings and
/// `Account::unpack`/`try_from_slice` call sites — account information a
/// native program has no `#[derive(Accounts)]` struct to declare (§4.2
/// "Native path": "account information is recovered from `Account::unpack`/
/// `try_from_slice` call sites and their surrounding context").
pub fn extract_native_account_structs(ast: &File, handlers: &[InstructionHandler]) -> Vec<AccountStruct> {
    let mut out = Vec::new();
    for handler in handlers {
        if !handler.accounts_type.starts_with("Native::") {
            continue;
        }
        let mut finder = FnFinder { name: handler.name.clone(), found: None };
        finder.visit_file(ast);
        let Some(item_fn) = finder.found else { continue };

        let body_text = quote::quote!(#item_fn).to_string();
        out.push(AccountStruct {
            name: handler.accounts_type.clone(),
            fields: recover_native_account_fields(&body_text),
            start_line: 0,
            end_line: 0,
        });
    }
    out
}

fn recover_native_account_fields(body_text: &str) -> Vec<AccountField> {
    static NEXT_ACCOUNT_RE: OnceLock<Regex> = OnceLock::new();
    let next_re = NEXT_ACCOUNT_RE.get_or_init(|| Regex::new(r"let\s+(\w+)\s*=\s*next_account_info\s*\(").unwrap());
    static UNPACK_VAR_RE: OnceLock<Regex> = OnceLock::new();
    let unpack_re = UNPACK_VAR_RE
        .get_or_init(|| Regex::new(r"(\w+)\s*\.\s*(?:data\s*\.\s*borrow\s*\(\s*\)|try_borrow_data\s*\(\s*\)\s*\?)").unwrap());

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for caps in next_re.captures_iter(body_text) {
        let name = caps[1].to_string();
        if seen.insert(name.clone()) {
            fields.push(AccountField {
                name,
                ty: AccountType::AccountInfo,
                constraints: Vec::new(),
                is_mutable: false,
                is_signer: false,
                is_init: false,
                line: 0,
            });
        }
    }
    for caps in unpack_re.captures_iter(body_text) {
        let name = caps[1].to_string();
        if seen.insert(name.clone()) {
            fields.push(AccountField {
                name,
                ty: AccountType::AccountInfo,
                constraints: Vec::new(),
                is_mutable: false,
                is_signer: false,
                is_init: false,
                line: 0,
            });
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_instruction_handler() {
        let source = r#"
            pub fn initialize(ctx: Context<Initialize>, amount: u64) -> Result<()> {
                let total = ctx.accounts.balance + amount;
                Ok(())
            }
        "#;

        let ast = syn::parse_file(source).unwrap();
        let handlers = extract_instruction_handlers(&ast);

        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].name, "initialize");
        assert_eq!(handlers[0].accounts_type, "Initialize");
        assert_eq!(handlers[0].args.len(), 1);
        assert_eq!(handlers[0].args[0].name, "amount");
    }

    #[test]
    fn test_detect_arithmetic_ops() {
        let source = r#"
            pub fn transfer(ctx: Context<Transfer>, amount: u64) -> Result<()> {
                let unchecked = a + b;
                let checked = a.checked_add(b).unwrap();
                Ok(())
            }
        "#;

        let ast = syn::parse_file(source).unwrap();
        let handlers = extract_instruction_handlers(&ast);

        assert_eq!(handlers.len(), 1);

        let unchecked_count = handlers[0]
            .arithmetic_ops
            .iter()
            .filter(|op| !op.is_checked)
            .count();
        let checked_count = handlers[0]
            .arithmetic_ops
            .iter()
            .filter(|op| op.is_checked)
            .count();

        assert!(unchecked_count >= 1);
        assert!(checked_count >= 1);
    }

    #[test]
    fn native_dispatch_target_becomes_an_instruction_handler() {
        let source = r#"
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
                Ok(())
            }
        "#;

        let ast = syn::parse_file(source).unwrap();
        let handlers = extract_native_instruction_handlers(&ast, source);

        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].name, "process_print_cash");
        assert_eq!(handlers[0].accounts_type, "Native::process_print_cash");

        let structs = extract_native_account_structs(&ast, &handlers);
        assert_eq!(structs.len(), 1);
        let field_names: Vec<&str> = structs[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert!(field_names.contains(&"mint_info"));
        assert!(field_names.contains(&"vault_info"));
    }

    #[test]
    fn anchor_style_function_is_not_picked_up_as_a_native_handler() {
        let source = r#"
            pub fn initialize(ctx: Context<Initialize>, amount: u64) -> Result<()> {
                Ok(())
            }
        "#;

        let ast = syn::parse_file(source).unwrap();
        assert!(extract_native_instruction_handlers(&ast, source).is_empty());
    }
}
