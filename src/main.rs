// src/main.rs

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indexer::{Config, Store};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(author, version, about = "Rebuild firmware and asset-pack release catalogs", long_about = None)]
struct Cli {
    /// Path to the TOML configuration (defaults plus environment if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reindex one directory, or every configured directory
    Reindex {
        /// Directory name, e.g. `firmware`
        directory: Option<String>,
    },

    /// Print the current index or catalog of a directory as JSON
    Show {
        directory: String,
    },

    /// Print the URL of a file in a channel's latest version
    Latest {
        directory: String,
        channel: String,
        target: String,
        /// Artifact type such as `update_tgz` or `full_bin`
        file_type: String,
    },

    /// List the files published for a branch
    BranchFiles {
        directory: String,
        branch: String,
    },

    /// Resolve a served file to its path on disk
    FilePath {
        directory: String,
        /// Channel directory, or pack id for pack catalogs
        name: String,
        file_name: String,

        /// Pack file kind (`download` or `preview`)
        #[arg(long)]
        kind: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Failed to build config from environment")?,
    };
    Ok(config)
}

/// Connect and reindex everything so query commands see a fresh tree
fn open_store(config: &Config) -> Result<Store> {
    let store = Store::from_config(config).context("Failed to connect to the git host")?;
    store
        .initialize()
        .context("Failed to prepare the files root")?;
    Ok(store)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Reindex { directory } => {
            let store = Store::from_config(&config).context("Failed to connect to the git host")?;
            match directory {
                Some(directory) => {
                    let report = store
                        .reindex(&directory)
                        .with_context(|| format!("Reindex of {directory} failed"))?;
                    info!(
                        "{}: generation {}, {} entries, {} directories removed",
                        report.directory,
                        report.generation,
                        report.entries,
                        report.removed.len()
                    );
                }
                None => {
                    store
                        .create_directories()
                        .context("Failed to prepare the files root")?;
                    let failures = store.reindex_all();
                    if !failures.is_empty() {
                        let names: Vec<&str> =
                            failures.iter().map(|(name, _)| name.as_str()).collect();
                        bail!("Reindex failed for {}", names.join(", "));
                    }
                }
            }
        }
        Commands::Show { directory } => {
            let store = open_store(&config)?;
            let snapshot = store.get_index(&directory)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Latest {
            directory,
            channel,
            target,
            file_type,
        } => {
            let store = open_store(&config)?;
            let url = store.get_file_from_latest_version(&directory, &channel, &target, &file_type)?;
            println!("{url}");
        }
        Commands::BranchFiles { directory, branch } => {
            let store = open_store(&config)?;
            for name in store.get_branch_file_names(&directory, &branch)? {
                println!("{name}");
            }
        }
        Commands::FilePath {
            directory,
            name,
            file_name,
            kind,
        } => {
            let store = open_store(&config)?;
            let path = store.get_file_path(&directory, &name, kind.as_deref(), &file_name)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
