//! Query API exposed to every downstream consumer of the Fact Graph
//! (§4.3). Consumers never traverse raw text except via excerpt strings
//! already captured on nodes.

use super::*;

impl FactGraph {
    /// `instruction(id)`.
    pub fn instruction(&self, id: &StableId) -> Option<&InstructionNode> {
        self.instructions.get(id)
    }

    /// `accountsOf(instruction)`.
    pub fn accounts_of(&self, instruction: &StableId) -> Vec<&AccountNode> {
        self.instruction(instruction)
            .map(|i| i.account_ids.iter().filter_map(|id| self.accounts.get(id)).collect())
            .unwrap_or_default()
    }

    /// `sinkNeighborhood(sinkId)`.
    pub fn sink_neighborhood(&self, sink_id: &StableId) -> Option<&SinkNeighborhood> {
        self.sink_neighborhoods.get(sink_id)
    }

    /// `cpisOf(instruction)`.
    pub fn cpis_of(&self, instruction: &StableId) -> Vec<&CpiNode> {
        self.cpis.values().filter(|c| &c.instruction == instruction).collect()
    }

    /// `pdasOf(instruction)`.
    pub fn pdas_of(&self, instruction: &StableId) -> Vec<&PdaNode> {
        self.pdas.values().filter(|p| &p.instruction == instruction).collect()
    }

    /// `findField(struct, name)`.
    pub fn find_field(&self, struct_name: &str, field_name: &str) -> Option<&AccountNode> {
        self.struct_fields
            .get(struct_name)?
            .iter()
            .find(|id| id.as_str().ends_with(&format!("ctx.{field_name}")))
            .and_then(|id| self.accounts.get(id))
    }

    /// `isSigner(fieldId)`.
    pub fn is_signer(&self, field_id: &StableId) -> bool {
        self.accounts.get(field_id).is_some_and(|a| a.is_signer)
    }

    /// `hasOwnerValidation(fieldId)`.
    ///
    /// True when the field carries an `owner`, `address`, or `constraint`
    /// guard, or when a guard node explicitly protects it.
    pub fn has_owner_validation(&self, field_id: &StableId) -> bool {
        let Some(account) = self.accounts.get(field_id) else {
            return false;
        };
        account.constraints.iter().any(|c| {
            matches!(
                c,
                ConstraintKind::Owner(_) | ConstraintKind::Address(_) | ConstraintKind::Constraint(_)
            )
        })
    }

    /// `hasAuthorityCheck(struct, fieldName, body)` (§4.4 "Authority-field heuristic").
    ///
    /// True when some account field in `struct_name` has `has_one =
    /// <field_name>`, or the instruction body textually references
    /// `<field_name>.key()` or `<field_name>.is_signer`.
    pub fn has_authority_check(&self, struct_name: &str, field_name: &str, body: &str) -> bool {
        let has_one_match = self
            .struct_fields
            .get(struct_name)
            .map(|ids| {
                ids.iter().any(|id| {
                    self.accounts.get(id).is_some_and(|a| {
                        a.constraints.iter().any(|c| matches!(c, ConstraintKind::HasOne(target) if target == field_name))
                    })
                })
            })
            .unwrap_or(false);

        has_one_match
            || body.contains(&format!("{field_name}.key()"))
            || body.contains(&format!("{field_name}.is_signer"))
    }

    /// Resolves the account struct name an instruction is bound to, if any.
    pub fn accounts_struct_of(&self, instruction: &StableId) -> Option<&str> {
        self.instruction(instruction).and_then(|i| i.accounts_struct.as_deref())
    }

    /// Whether a function name appears on the RHS of a native dispatch
    /// match arm, and if so, the normalized variant name it was matched
    /// from (§4.5 "Native instruction remapping").
    pub fn native_alias_for(&self, function_name: &str) -> Option<&str> {
        self.native_dispatch_aliases.get(&function_name.to_lowercase()).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::super::build;
    use crate::error::Diagnostics;
    use crate::ingest::IngestedFile;

    fn graph_from_source(source: &str) -> super::super::FactGraph {
        let file = IngestedFile {
            path: "lib.rs".to_string(),
            content: source.to_string(),
            line_count: source.lines().count(),
            content_hash: 0,
        };
        let mut diagnostics = Diagnostics::new();
        build(&[file], &mut diagnostics)
    }

    #[test]
    fn query_api_resolves_instruction_and_accounts() {
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
                pub vault: Account<'info, Vault>,
                pub authority: AccountInfo<'info>,
            }
        "#;

        let graph = graph_from_source(source);
        let id = super::super::StableId::instruction("lib.rs", "withdraw");
        let instruction = graph.instruction(&id).expect("withdraw instruction present");
        assert_eq!(instruction.name, "withdraw");
        assert!(!instruction.sink_ids.is_empty());

        let accounts = graph.accounts_of(&id);
        assert!(accounts.iter().any(|a| a.name == "authority"));
    }
}
