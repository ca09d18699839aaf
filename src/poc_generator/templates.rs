//! # Proof/Fix Plan Templates
//!
//! @title Handlebars Templates for Proof Plans, Fix Plans, and TS Scaffolds
//! @author Ramprasad
//!
//! One prose template per [`crate::candidates::VulnClass`] for the
//! `proofPlan`/`fixPlan` text of the Finding JSON schema (§6), plus the
//! TypeScript exploit scaffold templates kept for the opt-in
//! `--emit-poc-scaffold` convenience (§4.8 "supplement").

/// Common header included in all generated `.ts` scaffold files.
pub const HEADER_TEMPLATE: &str = r#"/**
 * Sentinel POC Scaffold: {{class}}
 * ===========================================
 * Program: {{program_name}}
 *
 * WARNING: This file is for security research purposes only.
 *          Never run these tests against production systems.
 */

import * as anchor from "@coral-xyz/anchor";
import { Program } from "@coral-xyz/anchor";
import {
    PublicKey,
    Keypair,
    SystemProgram,
    Transaction,
    LAMPORTS_PER_SOL
} from "@solana/web3.js";
import { expect } from "chai";
"#;

/// `{{instruction}}`, `{{file}}`, `{{line}}`, `{{account_names}}` are bound
/// from the [`crate::grade::ActionableFinding`] being rendered.
pub fn proof_plan_template(class: &str) -> &'static str {
    match class {
        "missing_signer" => {
            "Construct a call to `{{instruction}}` substituting a non-signing keypair for \
             one of {{account_names}}, sign only with an unrelated attacker key, and submit. \
             A vulnerable program accepts the transaction; a fixed program rejects it with a \
             missing-signature error."
        }
        "missing_owner" => {
            "Create an account owned by an attacker-controlled program whose data layout \
             mimics the expected type, pass it in place of {{account_names}} to `{{instruction}}`, \
             and observe whether the program reads attacker-controlled fields as trusted state."
        }
        "pda_derivation" => {
            "Derive the PDA for {{account_names}} using a non-canonical bump and submit it to \
             `{{instruction}}`. A vulnerable program accepts the alternate derivation; a fixed \
             program re-derives the canonical bump and rejects the mismatch."
        }
        "arbitrary_cpi" => {
            "Deploy a program with the same instruction interface as the CPI target invoked by \
             `{{instruction}}`, substitute its program id for the expected target, and verify the \
             vulnerable program performs the cross-program invocation against the substitute."
        }
        "type_confusion" => {
            "Construct an account whose raw bytes deserialize successfully under the type \
             expected by `{{instruction}}` but originate from a different account kind, and \
             confirm the program accepts it without a discriminator check."
        }
        "reinit" => {
            "After the legitimate initialization of {{account_names}}, call `{{instruction}}` a \
             second time with attacker-supplied initialization arguments and confirm the account's \
             state is reset rather than rejected."
        }
        "close_revive" => {
            "Submit `{{instruction}}` as a non-authority signer against an account whose lamports \
             are manually drained, then fund the same account address again and confirm the program \
             treats it as freshly initialized rather than closed."
        }
        "unchecked_realloc" => {
            "Shrink then grow {{account_names}} across two calls to `{{instruction}}` without an \
             intervening zero-fill, and inspect the reused buffer region for leftover data from the \
             account's prior allocation."
        }
        "integer_overflow" => {
            "Submit `{{instruction}}` with an amount near the integer type's maximum value and \
             confirm whether the resulting arithmetic wraps instead of returning an overflow error."
        }
        "state_machine_violation" => {
            "Call `{{instruction}}` while the state-account field is in a state that should \
             preclude this transition, and confirm whether the write succeeds without a guard."
        }
        "unvalidated_remaining_accounts" => {
            "Append additional, attacker-controlled accounts to `remaining_accounts` beyond what \
             `{{instruction}}` expects and confirm whether they are consumed without a length or \
             ownership check."
        }
        "oracle_validation" => {
            "Supply a price account with a stale `publish_time`/`publish_slot` to `{{instruction}}` \
             and confirm whether the program accepts the quote without a staleness check."
        }
        "token_authority_mismatch" => {
            "Submit {{account_names}} with a token authority distinct from the constraint \
             `{{instruction}}` expects and confirm whether the mismatch is rejected."
        }
        "stale_post_cpi" => {
            "Trigger a CPI inside `{{instruction}}` that mutates {{account_names}}, then read the \
             account's cached in-memory fields immediately afterward without a reload and confirm \
             whether stale pre-CPI values are used downstream."
        }
        "account_aliasing" => {
            "Pass the same account address for two distinct fields on {{account_names}} in \
             `{{instruction}}` and confirm whether the program treats them as independent."
        }
        _ => "Construct `{{instruction}}` with the involved accounts substituted per the finding's reason and observe the program's response.",
    }
}

/// Short imperative remediation text per class, used for `fixPlan`.
pub fn fix_plan_template(class: &str) -> &'static str {
    match class {
        "missing_signer" => "Add `#[account(signer)]` (or an explicit `is_signer` check) on {{account_names}} in the accounts struct for `{{instruction}}`.",
        "missing_owner" => "Replace the loose `AccountInfo`/`UncheckedAccount` on {{account_names}} with a typed `Account<'info, T>` or add an explicit owner check before use.",
        "pda_derivation" => "Store the canonical bump at initialization and require the caller-supplied bump to match it, or derive the bump internally via `find_program_address`.",
        "arbitrary_cpi" => "Validate the CPI target program id against a known constant or a stored `Program<'info, T>` account before invoking.",
        "type_confusion" => "Check the account's discriminator (or call `try_deserialize`, which enforces it) before trusting deserialized fields.",
        "reinit" => "Replace `init_if_needed` with `init`, or add an explicit `is_initialized` guard inside the handler body.",
        "close_revive" => "Require a signer-checked authority before draining lamports, and zero the account's data alongside the lamport transfer so revival cannot reuse stale state.",
        "unchecked_realloc" => "Pass `zero = true` on the `realloc` constraint, or manually zero the newly exposed buffer region after a manual `realloc` call.",
        "integer_overflow" => "Replace the raw arithmetic operator with its `checked_`/`saturating_` equivalent and propagate the resulting error.",
        "state_machine_violation" => "Add a `require!` guard comparing the current state value against the expected predecessor variant before the write.",
        "unvalidated_remaining_accounts" => "Check `remaining_accounts.len()` against an expected bound and validate each account's owner/key inside the loop.",
        "oracle_validation" => "Reject quotes whose `publish_time`/`publish_slot` exceeds a configured maximum age before using the price.",
        "token_authority_mismatch" => "Add a `has_one`/`address` constraint tying {{account_names}} to the expected authority.",
        "stale_post_cpi" => "Call `.reload()` (or re-deserialize) on {{account_names}} immediately after the CPI before reading its fields.",
        "account_aliasing" => "Add a distinguishing `address`/`has_one`/`seeds` constraint so the two fields cannot resolve to the same account.",
        _ => "Review the flagged instruction against the finding's reason and add the missing guard.",
    }
}

/// Per-class attack-path prose used in the optional TS scaffold's Mermaid diagram label.
pub fn attack_diagram_template(class: &str) -> &'static str {
    match class {
        "missing_signer" => "graph TD\n    A[Attacker] -->|No signature required| B[{{instruction}}]\n    B --> C[Unauthorized state change]",
        "arbitrary_cpi" => "graph TD\n    A[Attacker program] -->|Substituted as CPI target| B[{{instruction}}]\n    B --> C[Arbitrary code execution]",
        "close_revive" => "graph TD\n    A[Attacker] -->|Drains lamports manually| B[Closed account]\n    B -->|Refunds rent| C[Revived account]",
        _ => "graph TD\n    A[Attacker] --> B[{{instruction}}]\n    B --> C[Unvalidated sink]",
    }
}

/// Generic template for unrecognized detector types, kept for the TS scaffold path.
pub const GENERIC_TEMPLATE: &str = r#"
describe("{{class}} exploit", () => {
    const provider = anchor.AnchorProvider.env();
    anchor.setProvider(provider);

    const attacker = Keypair.generate();

    before(async () => {
        const sig = await provider.connection.requestAirdrop(
            attacker.publicKey,
            5 * LAMPORTS_PER_SOL
        );
        await provider.connection.confirmTransaction(sig);
    });

    {{#each findings}}
    it("should exercise {{instruction}} at {{file}}:{{line}}", async () => {
        console.log("\nTarget: {{title}}");
        console.log("Location: {{file}}:{{line}}");
        console.log("Proof plan: {{proof_plan}}");

        try {
            // TODO: Implement exploit logic per the proof plan above.
            console.log("VULNERABLE: Exploit succeeded!");
        } catch (error: any) {
            console.log("Result:", error.message);
        }
    });
    {{/each}}
});
"#;
