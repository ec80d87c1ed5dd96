//! `plinth install` command implementation.
//!
//! Resolves the requested packages against the configured repositories,
//! runs the conflict and consistency checks, then downloads and installs
//! everything into the target directory.

use std::sync::Arc;

use plinth_cache::InstallTarget;
use plinth_core::error::PlinthResult;
use plinth_installer::InstallOutcome;

use super::{build_orchestrator, install_options, is_terminal, packages, CommandContext};
use crate::PackageArgs;

/// Execute the `plinth install` command
pub async fn execute(args: PackageArgs, ctx: &CommandContext) -> PlinthResult<u8> {
    let requests = packages::parse_requests(&args.packages, args.package_version.as_deref(), &ctx.cwd)?;
    let target = ctx.target_dir();
    let options = install_options(ctx.settings(), args.force, args.check_only, is_terminal());

    ctx.output
        .step("Installing", &format!("{} into {}", args.packages.join(", "), target.display()));
    let orchestrator = build_orchestrator(ctx, Arc::new(InstallTarget::new(&target)), options)?;
    let report = orchestrator.install(requests).await?;

    ctx.output.report(&report);
    match report.outcome {
        InstallOutcome::NothingToDo => ctx.output.info("Everything requested is already installed"),
        InstallOutcome::CheckOnly => ctx.output.success("All checks passed, nothing was changed"),
        InstallOutcome::Completed => ctx
            .output
            .success(&format!("Installed {} package(s)", report.installed.len())),
    }
    Ok(report.exit_code())
}
