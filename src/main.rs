use anyhow::Result;
use clap::Parser;
use modbay::application::ConflictChoice;
use modbay::commands::{self, Config, ConfigOverrides};
use std::path::PathBuf;

/// modbay - mod package manager
///
/// Installs versioned mod packages into a local store, groups them into
/// profiles, completes missing dependencies from a remote catalog and
/// stages a profile into the game directory for a run.
///
/// Examples:
///   modbay install Owner-Modname-1.0.0.zip
///   modbay profile create default
///   modbay profile add default Modname
///   modbay --target ~/Games/Valheim stage default
#[derive(Parser, Debug)]
#[command(author, version = env!("MODBAY_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data root holding store, profiles and caches (also via MODBAY_ROOT)
    #[arg(long = "root", short = 'r', env = "MODBAY_ROOT", value_name = "PATH", global = true)]
    pub root: Option<PathBuf>,

    /// Game directory to stage into (also via MODBAY_TARGET)
    #[arg(long = "target", short = 't', env = "MODBAY_TARGET", value_name = "PATH", global = true)]
    pub target: Option<PathBuf>,

    /// Game folder name looked up in Steam libraries when no target is given
    #[arg(long = "game", env = "MODBAY_GAME", value_name = "NAME", global = true)]
    pub game: Option<String>,

    /// Catalog listing endpoint (also via MODBAY_CATALOG_URL)
    #[arg(long = "catalog-url", env = "MODBAY_CATALOG_URL", value_name = "URL", global = true)]
    pub catalog_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install package archives or directories named <owner>-<name>-<version>
    Install(InstallArgs),

    /// List installed packages
    List,

    /// Remove a package with all its versions
    Remove(RemoveArgs),

    /// Search installed packages by name
    Search(SearchArgs),

    /// Remote catalog operations
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Profile operations
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Stage a profile into the target directory
    Stage(StageArgs),

    /// Move a staged profile's loader state out of the target directory
    Unstage(ProfileArg),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Glob pattern; plain text matches as a substring
    pub pattern: String,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    pub ignore_case: bool,
}

#[derive(clap::Subcommand, Debug)]
enum CatalogCommands {
    /// Download the package listing
    Refresh {
        /// Retry transient network failures
        #[arg(long)]
        retry: bool,
    },
    /// Search the cached listing
    Search { text: String },
    /// Download and install a package by <owner>-<name>
    Install {
        full_name: String,
        /// Exact version (defaults to the latest)
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
pub struct ProfileArg {
    pub profile: String,
}

#[derive(clap::Args, Debug)]
pub struct StageArgs {
    pub profile: String,

    /// Seconds to wait for the loader to appear
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Prefer {
    /// Keep the installed version
    Existing,
    /// Install the version the profile asks for
    Needed,
}

#[derive(clap::Subcommand, Debug)]
enum ProfileCommands {
    /// Create an empty profile
    Create(ProfileArg),
    /// Delete a profile file
    Delete(ProfileArg),
    /// List profiles
    List,
    /// Show a profile's packages
    Show(ProfileArg),
    /// Add an installed package
    Add {
        profile: String,
        package: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Drop a package from a profile
    Drop { profile: String, package: String },
    /// Report missing and mismatched dependencies
    Check(ProfileArg),
    /// Download missing dependencies from the catalog
    Fetch {
        profile: String,
        /// How to settle version mismatches
        #[arg(long, value_enum, default_value_t = Prefer::Existing)]
        prefer: Prefer,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = modbay::runtime::RealRuntime;

    let config = Config::load(
        &runtime,
        ConfigOverrides {
            root: cli.root,
            target: cli.target,
            game: cli.game,
            catalog_url: cli.catalog_url,
        },
    )?;

    match cli.command {
        Commands::Install(args) => commands::store::install(&runtime, &config, &args.paths)?,
        Commands::List => commands::store::list(&runtime, &config)?,
        Commands::Remove(args) => commands::store::remove(&runtime, &config, &args.name)?,
        Commands::Search(args) => {
            commands::store::search(&runtime, &config, &args.pattern, args.ignore_case)?
        }
        Commands::Catalog(cmd) => run_catalog(&runtime, &config, cmd).await?,
        Commands::Profile(cmd) => run_profile(&runtime, &config, cmd).await?,
        Commands::Stage(args) => {
            commands::deploy::stage(&runtime, &config, &args.profile, args.timeout).await?
        }
        Commands::Unstage(args) => commands::deploy::unstage(&runtime, &config, &args.profile)?,
    }
    Ok(())
}

async fn run_catalog(
    runtime: &modbay::runtime::RealRuntime,
    config: &Config,
    cmd: CatalogCommands,
) -> Result<()> {
    match cmd {
        CatalogCommands::Refresh { retry } => commands::catalog::refresh(runtime, config, retry).await,
        CatalogCommands::Search { text } => commands::catalog::search(runtime, config, &text).await,
        CatalogCommands::Install { full_name, version } => {
            commands::catalog::install(runtime, config, &full_name, version.as_deref()).await
        }
    }
}

async fn run_profile(
    runtime: &modbay::runtime::RealRuntime,
    config: &Config,
    cmd: ProfileCommands,
) -> Result<()> {
    use commands::profile;

    match cmd {
        ProfileCommands::Create(args) => profile::create(runtime, config, &args.profile),
        ProfileCommands::Delete(args) => profile::delete(runtime, config, &args.profile),
        ProfileCommands::List => profile::list(runtime, config),
        ProfileCommands::Show(args) => profile::show(runtime, config, &args.profile),
        ProfileCommands::Add {
            profile: name,
            package,
            version,
        } => profile::add(runtime, config, &name, &package, version.as_deref()),
        ProfileCommands::Drop {
            profile: name,
            package,
        } => profile::drop_package(runtime, config, &name, &package),
        ProfileCommands::Check(args) => profile::check(runtime, config, &args.profile),
        ProfileCommands::Fetch {
            profile: name,
            prefer,
        } => {
            let choice = match prefer {
                Prefer::Existing => ConflictChoice::KeepExisting,
                Prefer::Needed => ConflictChoice::InstallNeeded,
            };
            profile::fetch(runtime, config, &name, choice).await
        }
    }
}
