//! # plinth-cli
//!
//! Command line front end of the Plinth plugin package manager.
//!
//! This is the main entry point. It parses the command line, sets up
//! logging and the panic hook, and maps the outcome of the dispatched
//! command to a process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use plinth_core::error::{PlinthError, PlinthResult};
use plinth_core::Architecture;
use tracing::{debug, error};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Install, fetch and remove application plugins
#[derive(Parser, Debug)]
#[command(name = "plinth", version, about = "Plugin package manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install packages and their dependencies
    Install(PackageArgs),
    /// Download packages and their dependencies without installing
    Get(GetArgs),
    /// Remove installed packages
    Uninstall(UninstallArgs),
}

/// Arguments shared by `install` and `get`
#[derive(Args, Debug, Clone, Default)]
pub struct PackageArgs {
    /// Package names, package archives (*.tar.gz) or directories of archives
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Version constraint for named packages, e.g. `1.2` or `^2.0`
    #[arg(long = "version", value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Operating system to select variants for
    #[arg(long)]
    pub os: Option<String>,

    /// Architecture to select variants for
    #[arg(long, value_parser = parse_architecture)]
    pub architecture: Option<Architecture>,

    /// Repository to search, may be repeated; searched before configured ones
    #[arg(short, long = "repository", value_name = "URL")]
    pub repositories: Vec<String>,

    /// Turn conflicts and unresolved dependencies into warnings
    #[arg(short, long)]
    pub force: bool,

    /// Install missing dependencies without asking
    #[arg(long, conflicts_with = "no_dependencies")]
    pub dependencies: bool,

    /// Install only the packages named on the command line
    #[arg(long)]
    pub no_dependencies: bool,

    /// Run every check, then stop before downloading
    #[arg(long)]
    pub check_only: bool,

    /// Never prompt
    #[arg(long)]
    pub non_interactive: bool,

    /// Directory to install into
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub packages: PackageArgs,

    /// Directory to save archives into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UninstallArgs {
    /// Names of installed packages
    #[arg(required = true, value_name = "PACKAGE")]
    pub names: Vec<String>,

    /// Remove even if other packages depend on them
    #[arg(short, long)]
    pub force: bool,

    /// Run the dependency check, then stop
    #[arg(long)]
    pub check_only: bool,

    /// Directory packages are installed in
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

fn parse_architecture(value: &str) -> Result<Architecture, String> {
    value.parse().map_err(|e: PlinthError| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting plinth v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprint!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::from(e.exit_code())
        },
    }
}

fn run_cli(cli: Cli) -> PlinthResult<u8> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| PlinthError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(&cli.command).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

/// Crates whose logs `--verbose` turns up
const LOG_TARGETS: &[&str] = &[
    "plinth",
    "plinth_installer",
    "plinth_resolver",
    "plinth_registry",
    "plinth_cache",
    "plinth_config",
];

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",");
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("plinth encountered an unexpected error: {}", panic_info);
        eprintln!("plinth crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/plinth-pm/plinth/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
