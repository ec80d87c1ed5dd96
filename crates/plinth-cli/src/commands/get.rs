//! `plinth get` command implementation.

use std::sync::Arc;

use plinth_cache::InstallTarget;
use plinth_core::error::{PlinthError, PlinthResult};

use super::{build_orchestrator, install_options, is_terminal, packages, CommandContext};
use crate::GetArgs;

/// Download the requested packages and their dependencies into `--output`
pub async fn execute(args: GetArgs, ctx: &CommandContext) -> PlinthResult<u8> {
    let GetArgs { packages: args, output } = args;
    let requests = packages::parse_requests(&args.packages, args.package_version.as_deref(), &ctx.cwd)?;
    let destination = ctx.resolve(&output);
    tokio::fs::create_dir_all(&destination)
        .await
        .map_err(|e| PlinthError::io(format!("Failed to create {}", destination.display()), e))?;

    let options = install_options(ctx.settings(), args.force, args.check_only, is_terminal());
    // The install target is never written to by a fetch
    let installer = Arc::new(InstallTarget::new(ctx.target_dir()));
    let orchestrator = build_orchestrator(ctx, installer, options)?;

    ctx.output
        .step("Fetching", &format!("{} into {}", args.packages.join(", "), destination.display()));
    let report = orchestrator.fetch(requests, &destination).await?;

    ctx.output.report(&report);
    for artifact in &report.artifacts {
        ctx.output.info(&format!("  {}", artifact.display()));
    }
    ctx.output
        .success(&format!("Fetched {} archive(s)", report.artifacts.len()));
    Ok(report.exit_code())
}
