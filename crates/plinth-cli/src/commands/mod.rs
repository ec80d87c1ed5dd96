//! Command implementations and dispatch logic.
//!
//! Every command loads the layered configuration once into a
//! `CommandContext`, builds an orchestrator from it and returns the process
//! exit code of a successful run.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use camino::Utf8PathBuf;
use plinth_cache::ArtifactStore;
use plinth_config::{ConfigLayering, ConfigLoader, PlinthToml, RepositoryEntry, Settings};
use plinth_core::error::{PlinthError, PlinthResult};
use plinth_core::{host_os, Architecture, MissingDependencyPolicy};
use plinth_installer::{CacheHandle, InstallOptions, InstallationOrchestrator, PackageInstaller};
use plinth_registry::{open_repository, IndexCache, Repository, RetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod get;
pub mod install;
pub mod packages;
pub mod prompt;
pub mod uninstall;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    /// Effective configuration after layering
    pub config: PlinthToml,
}

impl CommandContext {
    /// Load configuration layers for `command`
    pub async fn new(command: &Commands) -> PlinthResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| PlinthError::io("Failed to get current directory".to_string(), e))?;
        let utf8_cwd = Utf8PathBuf::from_path_buf(cwd.clone()).map_err(|path| {
            PlinthError::ConfigValidation {
                field: "cwd".to_string(),
                reason: format!("{} is not valid UTF-8", path.display()),
            }
        })?;

        let loader = ConfigLoader::new(utf8_cwd);
        let global = match ConfigLoader::global_config_path() {
            Ok(path) => ConfigLoader::load_optional(&path).await?,
            Err(e) => {
                debug!(error = %e, "skipping global configuration");
                None
            },
        };
        let project = loader.load_project_config().await?.map(|(config, _)| config);

        let config = ConfigLayering::merge_configs(
            global,
            project,
            ConfigLayering::collect_env_overrides(),
            cli_layer(command),
        )?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            config,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    /// Install target directory, relative paths taken from the working directory
    pub fn target_dir(&self) -> PathBuf {
        match &self.config.settings.target {
            Some(target) => self.resolve(target),
            None => self.cwd.clone(),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> PlinthResult<u8> {
    match command {
        Commands::Install(args) => {
            info!(packages = ?args.packages, "installing");
            install::execute(args, ctx).await
        },
        Commands::Get(args) => {
            info!(packages = ?args.packages.packages, output = %args.output.display(), "fetching");
            get::execute(args, ctx).await
        },
        Commands::Uninstall(args) => {
            info!(packages = ?args.names, "uninstalling");
            uninstall::execute(args, ctx).await
        },
    }
}

/// Configuration layer made of command-line flags
pub fn cli_layer(command: &Commands) -> PlinthToml {
    let mut layer = PlinthToml::default();
    match command {
        Commands::Install(args) | Commands::Get(crate::GetArgs { packages: args, .. }) => {
            let settings = &mut layer.settings;
            settings.target = args.target.clone();
            settings.os = args.os.clone();
            settings.architecture = args.architecture;
            settings.timeout = args.timeout;
            if args.non_interactive {
                settings.interactive = Some(false);
            }
            if args.dependencies {
                settings.missing_dependencies = Some(MissingDependencyPolicy::Include);
            } else if args.no_dependencies {
                settings.missing_dependencies = Some(MissingDependencyPolicy::Skip);
            }
            layer.repositories = args.repositories.iter().map(RepositoryEntry::new).collect();
        },
        Commands::Uninstall(args) => {
            layer.settings.target = args.target.clone();
            layer.settings.timeout = args.timeout;
        },
    }
    layer
}

/// Orchestrator options from the effective settings and per-run flags.
///
/// `terminal` says whether prompting is possible at all.
pub fn install_options(settings: &Settings, force: bool, check_only: bool, terminal: bool) -> InstallOptions {
    let interactive = terminal && settings.interactive.unwrap_or(true);
    let mut policy = settings.missing_dependencies.unwrap_or_default();
    if policy == MissingDependencyPolicy::Ask && !interactive {
        debug!("cannot ask about missing dependencies, including them");
        policy = MissingDependencyPolicy::Include;
    }

    let mut options = InstallOptions::default()
        .forced(force)
        .check_only(check_only)
        .interactive(interactive)
        .with_missing_dependencies(policy)
        .with_platform(
            Some(settings.os.clone().unwrap_or_else(host_os)),
            settings.architecture.unwrap_or_else(Architecture::host),
        );
    if let Some(timeout) = settings.timeout() {
        options = options.with_timeout(timeout);
    }
    options
}

/// Whether prompts can be shown
pub fn is_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Open every configured repository, in priority order
pub fn open_repositories(config: &PlinthToml) -> PlinthResult<Vec<Arc<dyn Repository>>> {
    let retry = RetryConfig::default();
    config
        .repositories
        .iter()
        .map(|entry| open_repository(&entry.url, &retry))
        .collect()
}

/// Artifact cache from the configured cache directory, if any
pub fn cache_handle(ctx: &CommandContext) -> PlinthResult<CacheHandle> {
    let artifacts = match &ctx.settings().cache_dir {
        Some(dir) => {
            let dir = Utf8PathBuf::from_path_buf(ctx.resolve(dir)).map_err(|path| {
                PlinthError::ConfigValidation {
                    field: "settings.cache-dir".to_string(),
                    reason: format!("{} is not valid UTF-8", path.display()),
                }
            })?;
            Some(Arc::new(ArtifactStore::open(dir)?))
        },
        None => None,
    };
    Ok(CacheHandle::new(artifacts, Arc::new(IndexCache::new())))
}

/// Assemble an orchestrator and wire Ctrl-C to its cancellation token
pub fn build_orchestrator(
    ctx: &CommandContext,
    installer: Arc<dyn PackageInstaller>,
    options: InstallOptions,
) -> PlinthResult<InstallationOrchestrator> {
    let repositories = open_repositories(&ctx.config)?;
    if repositories.is_empty() {
        debug!("no repositories configured");
    }

    let mut orchestrator = InstallationOrchestrator::new(repositories, installer)
        .with_cache(cache_handle(ctx)?);
    if options.interactive {
        orchestrator = orchestrator.with_prompt(Arc::new(prompt::TerminalPrompt));
    }
    let orchestrator = orchestrator.with_options(options);

    cancel_on_ctrl_c(orchestrator.cancellation_token());
    Ok(orchestrator)
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    warn!("interrupted, stopping after the current step");
                    token.cancel();
                },
                Err(e) => debug!(error = %e, "cannot listen for Ctrl-C"),
            },
            _ = token.cancelled() => {},
        }
    });
}
