use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use kube_flavor::config::PluginConfig;
use kube_flavor::flavor::{FlavorPlugin, KubernetesFlavor};
use kube_flavor::instance::{AllocationMethod, InstanceDescription, InstanceSpec};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Kubernetes flavor plugin", long_about = None)]
struct Cli {
    /// Plugin name to advertise for discovery
    #[arg(long, default_value = "flavor-kubernetes")]
    name: String,

    /// Logging level. 0 is least verbose. Max is 5
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..=5))]
    log: u8,

    /// Plugin configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Certificate authority working directory (overrides the config file)
    #[arg(long)]
    ssl_dir: Option<PathBuf>,

    /// Per-script timeout in seconds (overrides the config file)
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check flavor properties
    Validate {
        /// JSON file with the group's flavor properties
        flavor: PathBuf,
    },
    /// Prepare an instance draft and print the result
    Prepare {
        flavor: PathBuf,
        /// JSON file with the instance spec
        instance: PathBuf,
        /// JSON file with the allocation method
        #[arg(long)]
        allocation: Option<PathBuf>,
    },
    /// Report the health of an instance
    Health {
        flavor: PathBuf,
        /// JSON file with the instance description
        description: PathBuf,
    },
    /// Print the version
    Version,
}

fn level_filter(log: u8) -> &'static str {
    match log {
        0 | 1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

fn load_config(cli: &Cli) -> Result<PluginConfig> {
    let mut config = match &cli.config {
        Some(path) => PluginConfig::load(path)?,
        None => PluginConfig::default(),
    };
    if let Some(dir) = &cli.ssl_dir {
        config.ssl_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        config.script_timeout_secs = secs;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let ssl_dir = config.ssl_dir.clone();
    let plugin = KubernetesFlavor::from_config(config).with_name(&cli.name);
    info!(plugin = plugin.name(), ssl_dir = %ssl_dir.display(), "Starting");

    match &cli.command {
        Commands::Validate { flavor } => {
            let properties: Value = read_json(flavor)?;
            plugin.validate(&properties, &AllocationMethod::default())?;
            println!("ok");
        }
        Commands::Prepare { flavor, instance, allocation } => {
            let properties: Value = read_json(flavor)?;
            let spec: InstanceSpec = read_json(instance)?;
            let allocation = match allocation {
                Some(path) => read_json(path)?,
                None => AllocationMethod::default(),
            };
            let prepared = plugin.prepare(&properties, &spec, &allocation).await?;
            println!("{}", serde_json::to_string_pretty(&prepared)?);
        }
        Commands::Health { flavor, description } => {
            let properties: Value = read_json(flavor)?;
            let description: InstanceDescription = read_json(description)?;
            let health = plugin.healthy(&properties, &description).await?;
            println!("{}", health);
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_filter(cli.log)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
