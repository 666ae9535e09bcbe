/// Cadence - headless queue player
use cadence_cli::{commands, CliConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Drive the cadence playback engine from the command line", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./cadence.toml when present)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a queue file on a simulated backend, printing notifications as JSON lines
    Play {
        /// JSON array of tracks
        queue: PathBuf,

        /// Time spent on each track before skipping (milliseconds)
        #[arg(long, default_value_t = 500)]
        dwell_ms: u64,
    },
    /// Validate a queue file and list its tracks
    Queue {
        /// JSON array of tracks
        queue: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries notifications
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { queue, dwell_ms } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            config.validate()?;
            tracing::debug!(?config, "Configuration loaded");

            commands::play(&config, &queue, Duration::from_millis(dwell_ms)).await?;
        }
        Commands::Queue { queue } => {
            commands::queue(&queue)?;
        }
    }

    Ok(())
}
