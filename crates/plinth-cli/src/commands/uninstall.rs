//! `plinth uninstall` command implementation.

use std::sync::Arc;

use plinth_cache::InstallTarget;
use plinth_core::error::PlinthResult;
use plinth_installer::InstallOutcome;

use super::{build_orchestrator, install_options, CommandContext};
use crate::UninstallArgs;

/// Remove installed packages, dependents first
pub async fn execute(args: UninstallArgs, ctx: &CommandContext) -> PlinthResult<u8> {
    let target = ctx.target_dir();
    let options = install_options(ctx.settings(), args.force, args.check_only, false);

    ctx.output
        .step("Removing", &format!("{} from {}", args.names.join(", "), target.display()));
    let orchestrator = build_orchestrator(ctx, Arc::new(InstallTarget::new(&target)), options)?;
    let report = orchestrator.uninstall(args.names).await?;

    ctx.output.report(&report);
    if report.outcome == InstallOutcome::Completed {
        ctx.output
            .success(&format!("Removed {} package(s)", report.uninstalled.len()));
    }
    Ok(report.exit_code())
}
