//! Network topology validator CLI (nettopo)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nettopo_cli::commands::{domain_keys, ValidateCommand};
use nettopo_cli::settings::Settings;
use nettopo_config::ConfigDomain;
use nettopo_validate::ValidationOptions;

#[derive(Parser)]
#[command(name = "nettopo")]
#[command(about = "Network topology consistency validator")]
#[command(version)]
#[command(long_about = "
Network topology consistency validator

Checks the network catalogue, network profiles, hosts, CaaS settings and
storage profiles of a cluster before they are used for deployment. Documents are read from a
directory holding one <domain key>.json file per configuration domain.

Examples:
  nettopo validate                                   # Validate every domain
  nettopo validate --store ./properties              # Use another store directory
  nettopo validate --changed hosts --changed caas    # Validate a hosts and caas change
  nettopo domains                                    # List the domain keys
")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (default: /etc/nettopo/nettopo.toml, ./nettopo.toml)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration documents
    Validate {
        /// Property store directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Domain treated as changed, by key or short name (repeatable)
        #[arg(short, long)]
        changed: Vec<ConfigDomain>,

        /// Allow several untagged networks on one interface
        #[arg(long)]
        virtualized: bool,
    },

    /// List the configuration domain keys
    Domains,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Validate {
            store,
            changed,
            virtualized,
        } => {
            validate(cli.settings, store, changed, virtualized).await
        }
        Commands::Domains => {
            for key in domain_keys() {
                println!("{}", key);
            }
            Ok(true)
        }
    };

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);

            if cli.verbose || cli.debug {
                for cause in e.chain().skip(1) {
                    eprintln!("  Caused by: {}", cause);
                }
            }
            std::process::exit(1);
        }
    }
}

async fn validate(
    settings_path: Option<PathBuf>,
    store: Option<PathBuf>,
    changed: Vec<ConfigDomain>,
    virtualized: bool,
) -> Result<bool> {
    let settings = Settings::load(settings_path.as_deref()).context("Failed to load settings")?;

    let changed = if !changed.is_empty() {
        changed
    } else if !settings.default_domains.is_empty() {
        settings
            .default_domains
            .iter()
            .map(|name| name.parse::<ConfigDomain>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid default_domains setting")?
    } else {
        ConfigDomain::ALL.to_vec()
    };

    let options = ValidationOptions {
        virtualized: virtualized || settings.virtualized,
    };
    let store_dir = store.unwrap_or(settings.store_dir);

    ValidateCommand::new(store_dir, options).execute(&changed).await
}
