//! # Proof Plan / Fix Plan Generator
//!
//! @title Exploit Hypothesis and Remediation Text Generator
//! @author Ramprasad
//!
//! Renders the `proofPlan`/`fixPlan` strings of the Finding JSON schema
//! (§6) per [`crate::grade::ActionableFinding`], and — opt-in via
//! `--emit-poc-scaffold` — writes a fuller TypeScript exploit scaffold to
//! disk for local, non-networked use. Executing a PoC is the external
//! [`crate::collaborators::PocCollaborator`]'s job; this module only ever
//! produces text and scaffold files, never runs anything.
//!
//! This is a trimmed descendant of the original `PocGenerator`: the same
//! `handlebars::Handlebars` template machinery, rebound from per-detector
//! V-codes to [`crate::candidates::VulnClass`] and from a flat `Finding`
//! list to [`crate::grade::ActionableFinding`] (§4.8 "supplement").

mod templates;

use crate::error::ScanError;
use crate::grade::ActionableFinding;
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn handlebars() -> &'static Handlebars<'static> {
    static INSTANCE: OnceLock<Handlebars<'static>> = OnceLock::new();
    INSTANCE.get_or_init(Handlebars::new)
}

#[derive(Serialize)]
struct PlanContext<'a> {
    instruction: &'a str,
    file: &'a str,
    line: usize,
    account_names: String,
    class: &'a str,
}

fn plan_context(finding: &ActionableFinding) -> PlanContext<'_> {
    PlanContext {
        instruction: &finding.instruction,
        file: &finding.file,
        line: finding.line,
        account_names: if finding.account_names.is_empty() {
            "the involved accounts".to_string()
        } else {
            finding.account_names.join(", ")
        },
        class: finding.vuln_class.as_str(),
    }
}

fn render(template: &str, context: &PlanContext<'_>) -> String {
    handlebars()
        .render_template(template, context)
        .unwrap_or_else(|_| template.to_string())
}

/// Renders the `proofPlan` text for one finding (§6 "Finding JSON schema").
pub fn proof_plan_for(finding: &ActionableFinding) -> String {
    let template = templates::proof_plan_template(finding.vuln_class.as_str());
    render(template, &plan_context(finding))
}

/// Renders the `fixPlan` text for one finding (§6 "Finding JSON schema").
pub fn fix_plan_for(finding: &ActionableFinding) -> String {
    let template = templates::fix_plan_template(finding.vuln_class.as_str());
    render(template, &plan_context(finding))
}

#[derive(Serialize)]
struct ScaffoldFinding {
    instruction: String,
    file: String,
    line: usize,
    title: String,
    proof_plan: String,
}

#[derive(Serialize)]
struct ScaffoldContext<'a> {
    class: &'a str,
    program_name: &'a str,
    findings: Vec<ScaffoldFinding>,
}

/// Writes an opt-in TypeScript exploit scaffold plus an attack-path
/// Markdown document for `findings`, grouped by vulnerability class, one
/// `describe` block per class (teacher's `PocGenerator::generate_all`
/// file-writing behavior, kept as a convenience rather than a pipeline
/// stage — §4.8 "supplement").
pub fn write_poc_scaffold(
    findings: &[ActionableFinding],
    output_dir: &Path,
    program_name: Option<&str>,
) -> Result<Vec<PathBuf>, ScanError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ScanError::IngestError {
        path: output_dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let program_name = program_name.unwrap_or("unknown_program");
    let mut grouped: BTreeMap<&'static str, Vec<&ActionableFinding>> = BTreeMap::new();
    for finding in findings {
        grouped.entry(finding.vuln_class.as_str()).or_default().push(finding);
    }

    let mut body = String::new();
    body.push_str(&render(
        templates::HEADER_TEMPLATE,
        &plan_context(findings.first().unwrap_or(&placeholder_finding())),
    ));

    let mut written = Vec::new();
    let mut attack_paths = String::from("# Attack Paths\n\n");

    for (class, class_findings) in &grouped {
        let scaffold_findings: Vec<ScaffoldFinding> = class_findings
            .iter()
            .map(|f| ScaffoldFinding {
                instruction: f.instruction.clone(),
                file: f.file.clone(),
                line: f.line,
                title: f.title.clone(),
                proof_plan: proof_plan_for(f),
            })
            .collect();

        let context = ScaffoldContext { class, program_name, findings: scaffold_findings };
        let rendered = handlebars()
            .render_template(templates::GENERIC_TEMPLATE, &context)
            .unwrap_or_default();
        body.push_str(&rendered);

        let diagram = templates::attack_diagram_template(class);
        attack_paths.push_str(&format!("## {class}\n\n```mermaid\n{diagram}\n```\n\n"));
    }

    let ts_path = output_dir.join("exploit_poc.ts");
    std::fs::write(&ts_path, &body).map_err(|e| ScanError::IngestError {
        path: ts_path.display().to_string(),
        reason: e.to_string(),
    })?;
    written.push(ts_path);

    let md_path = output_dir.join("attack_paths.md");
    std::fs::write(&md_path, &attack_paths).map_err(|e| ScanError::IngestError {
        path: md_path.display().to_string(),
        reason: e.to_string(),
    })?;
    written.push(md_path);

    Ok(written)
}

fn placeholder_finding() -> ActionableFinding {
    ActionableFinding {
        vuln_class: crate::candidates::VulnClass::MissingSigner,
        grade: crate::grade::Grade::D,
        enforced_severity: crate::report::Severity::Info,
        instruction: String::new(),
        instruction_aliases: None,
        file: String::new(),
        line: 0,
        end_line: 0,
        account_names: Vec::new(),
        confidence: 0.0,
        status: crate::grade::FindingStatus::Likely,
        title: String::new(),
        reason: String::new(),
        fingerprint: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::VulnClass;
    use crate::grade::{FindingStatus, Grade};
    use crate::report::Severity;

    fn finding(class: VulnClass) -> ActionableFinding {
        ActionableFinding {
            vuln_class: class,
            grade: Grade::C,
            enforced_severity: Severity::High,
            instruction: "lib.rs::withdraw".to_string(),
            instruction_aliases: None,
            file: "lib.rs".to_string(),
            line: 42,
            end_line: 44,
            account_names: vec!["authority".to_string()],
            confidence: 0.7,
            status: FindingStatus::Likely,
            title: "Missing Signer Check".to_string(),
            reason: "authority not signer-checked".to_string(),
            fingerprint: "fp-1".to_string(),
        }
    }

    #[test]
    fn proof_plan_substitutes_instruction_and_accounts() {
        let f = finding(VulnClass::MissingSigner);
        let plan = proof_plan_for(&f);
        assert!(plan.contains("lib.rs::withdraw"));
        assert!(plan.contains("authority"));
    }

    #[test]
    fn fix_plan_is_nonempty_for_every_class() {
        for class in [
            VulnClass::MissingSigner,
            VulnClass::MissingOwner,
            VulnClass::PdaBumpMisuse,
            VulnClass::ArbitraryCpi,
            VulnClass::CloseWithoutZero,
            VulnClass::IntegerOverflow,
        ] {
            let f = finding(class);
            assert!(!fix_plan_for(&f).is_empty());
        }
    }

    #[test]
    fn write_poc_scaffold_creates_ts_and_markdown_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let findings = vec![finding(VulnClass::MissingSigner)];
        let written = write_poc_scaffold(&findings, dir.path(), Some("test_program")).unwrap();
        assert_eq!(written.len(), 2);
        for path in &written {
            assert!(path.exists());
        }
    }
}
