//! Terminal prompts

use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use plinth_core::PackageDefinition;
use plinth_installer::{DecisionPrompt, OverwriteDecision};
use plinth_resolver::{group_by_offender, FileConflict};
use tracing::debug;

/// Asks on the terminal; a failed prompt counts as "no"
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt;

impl DecisionPrompt for TerminalPrompt {
    fn include_dependency(&self, dependency: &PackageDefinition) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} is not installed. Install it too?", dependency.identity))
            .default(true)
            .interact()
            .unwrap_or_else(|e| {
                debug!(error = %e, "prompt failed");
                false
            })
    }

    fn resolve_overwrite(&self, conflicts: &[FileConflict]) -> OverwriteDecision {
        eprintln!("{}", describe_conflicts(conflicts));

        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Files owned by other packages would be overwritten")
            .items(&["Cancel", "Overwrite anyway"])
            .default(0)
            .interact();
        match choice {
            Ok(1) => OverwriteDecision::OverwriteAnyway,
            Ok(_) => OverwriteDecision::Cancel,
            Err(e) => {
                debug!(error = %e, "prompt failed");
                OverwriteDecision::Cancel
            },
        }
    }
}

/// One block per incoming package listing the files it would take over
pub fn describe_conflicts(conflicts: &[FileConflict]) -> String {
    let mut out = String::new();
    for (offender, files) in group_by_offender(conflicts) {
        out.push_str(&format!("{}:\n", offender));
        for conflict in files {
            out.push_str(&format!("  {}\n", conflict));
        }
    }
    out
}
