mod apply_commands;
mod config_commands;
mod init_commands;
mod resource_commands;
mod style;

use std::path::PathBuf;

use {
    anyhow::Context as _,
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    vibes_common::{ResourceKind, paths},
    vibes_config::{Layers, load_merged},
    vibes_resources::{ResourceService, Scope},
};

#[derive(Parser)]
#[command(
    name = "vibes",
    version,
    about = "positive-vibes: sync skills, instructions, and agents into AI coding assistants"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Project directory (defaults to the current directory).
    #[arg(long, short = 'C', global = true)]
    project_dir: Option<PathBuf>,

    /// Custom config directory holding the global vibes.yaml
    /// (overrides default ~/.config/positive-vibes/).
    #[arg(long, global = true, env = "VIBES_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Custom registry cache directory
    /// (overrides default ~/.cache/positive-vibes/cache/).
    #[arg(long, global = true, env = "VIBES_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter vibes.yaml in the project.
    Init {
        /// Overwrite an existing manifest.
        #[arg(long)]
        force: bool,
    },
    /// Install everything the manifest declares into each target.
    Apply {
        /// Overwrite resources that are already installed.
        #[arg(long)]
        force: bool,
        /// Symlink instead of copying where possible.
        #[arg(long)]
        link: bool,
        /// Pull git registries tracking `latest` before applying.
        #[arg(long)]
        refresh: bool,
    },
    /// Add resources to the manifest.
    Install {
        /// skills, instructions, or agents.
        kind: ResourceKind,
        #[arg(required = true)]
        names: Vec<String>,
        /// Edit the global manifest instead of the project one.
        #[arg(long)]
        global: bool,
    },
    /// Remove resources from the manifest.
    Remove {
        /// skills, instructions, or agents.
        kind: ResourceKind,
        #[arg(required = true)]
        names: Vec<String>,
        /// Edit the global manifest instead of the project one.
        #[arg(long)]
        global: bool,
    },
    /// Show details about one resource.
    Show { kind: ResourceKind, name: String },
    /// List resources declared in the manifest, or available in registries.
    List {
        kind: ResourceKind,
        /// List what the registries offer instead of what is installed.
        #[arg(long)]
        available: bool,
    },
    /// Inspect the merged configuration.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Resolved locations shared by every command.
pub(crate) struct Context {
    pub project_dir: PathBuf,
    pub global_path: PathBuf,
    pub cache_root: PathBuf,
}

impl Context {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        if let Some(ref dir) = cli.config_dir {
            paths::set_config_dir(dir.clone());
        }
        if let Some(ref dir) = cli.cache_dir {
            paths::set_cache_dir(dir.clone());
        }
        let project_dir = match cli.project_dir {
            Some(ref dir) => std::path::absolute(dir)
                .with_context(|| format!("cannot resolve {}", dir.display()))?,
            None => std::env::current_dir().context("cannot determine current directory")?,
        };
        Ok(Self {
            project_dir,
            global_path: paths::global_manifest_path()?,
            cache_root: paths::cache_dir()?,
        })
    }

    /// Load and merge the project and global manifests.
    pub fn load_layers(&self) -> anyhow::Result<Layers> {
        load_merged(&self.project_dir, Some(&self.global_path)).map_err(|e| {
            if e.is_not_found() {
                anyhow::anyhow!(
                    "no vibes.yaml in {} and no global manifest at {} (run `vibes init`)",
                    self.project_dir.display(),
                    self.global_path.display()
                )
            } else {
                e.into()
            }
        })
    }

    pub fn service(&self, global: bool) -> ResourceService {
        let scope = if global {
            Scope::Global
        } else {
            Scope::Local
        };
        ResourceService::new(
            self.project_dir.clone(),
            Some(self.global_path.clone()),
            self.cache_root.clone(),
        )
        .with_scope(scope)
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let ctx = Context::from_cli(&cli)?;
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        project = %ctx.project_dir.display(),
        "positive-vibes starting"
    );

    match cli.command {
        Commands::Init { force } => init_commands::handle_init(&ctx, force),
        Commands::Apply {
            force,
            link,
            refresh,
        } => apply_commands::handle_apply(&ctx, force, link, refresh).await,
        Commands::Install {
            kind,
            names,
            global,
        } => resource_commands::handle_install(&ctx, kind, &names, global).await,
        Commands::Remove {
            kind,
            names,
            global,
        } => resource_commands::handle_remove(&ctx, kind, &names, global),
        Commands::Show { kind, name } => resource_commands::handle_show(&ctx, kind, &name).await,
        Commands::List { kind, available } => {
            resource_commands::handle_list(&ctx, kind, available).await
        },
        Commands::Config { action } => config_commands::handle_config(&ctx, action),
    }
}
