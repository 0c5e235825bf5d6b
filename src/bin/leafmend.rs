//! leafmend: diagnose plant leaf photos from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leafmend::config::{Config, Secrets};
use leafmend::{Diagnoser, LeafmendError};

/// Leaf disease diagnosis with cached model and LLM calls.
#[derive(Parser)]
#[command(name = "leafmend")]
#[command(version = leafmend::PKG_VERSION)]
#[command(about = "Plant leaf disease diagnosis")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a leaf image and ask for treatment advice.
    Diagnose {
        /// Image file (PNG, JPEG, ...).
        image: PathBuf,

        /// Run the diagnosis this many times; repeats are served from cache.
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leafmend=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    match args.command {
        Command::Diagnose { image, repeat } => {
            let bytes = std::fs::read(&image).map_err(|e| {
                LeafmendError::Configuration(format!("Failed to read image {image:?}: {e}"))
            })?;

            let diagnoser = Diagnoser::from_config(&config, &secrets).await?;
            info!(version = leafmend::version_string(), image = ?image, "diagnosing");

            for round in 1..=repeat.max(1) {
                let diagnosis = diagnoser.diagnose(&bytes).await;
                if repeat > 1 {
                    println!("--- run {round} ---");
                }
                println!("Prediction: {}", diagnosis.label_text());
                if let Some(advice) = diagnosis.recommendation_text() {
                    println!("Recommended care:\n{advice}");
                }
            }
        }
    }

    Ok(())
}
