use std::path::PathBuf;

use anyhow::Context;
use bazaar::app::App;
use bazaar::config::Config;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

/// Bazaar - wallets, predictions, a shop and timed auctions for chat servers.
#[derive(Parser, Debug)]
#[command(name = "bazaar")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the economy against the console (one line per chat message)
    Run(RunArgs),

    /// Validate a configuration file and exit
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Member who says lines without an `@name` prefix
    #[arg(long = "as", value_name = "NAME")]
    speaker: Option<String>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let loaded = Config::load(&config)
                .with_context(|| format!("invalid config {}", config.display()))?;
            println!(
                "{} is valid: {:?} store in {}, {} console member(s)",
                config.display(),
                loaded.storage.backend,
                loaded.storage.data_dir.display(),
                loaded.console.members.len()
            );
            Ok(())
        }
        Commands::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }

    config.init_logging();
    info!("bazaar starting");

    tokio::select! {
        result = App::run(config, args.speaker) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                return Err(e.into());
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("bazaar stopped");
    Ok(())
}
