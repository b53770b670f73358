use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glide_core::GlideConfig;

mod commands;

#[derive(Parser)]
#[command(name = "glide")]
#[command(author, version, about = "Drive the glide scroll engine from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ~/.config/glide/config.toml
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted gesture session and print every published position
    Replay {
        /// Script file (.json or .toml)
        script: PathBuf,
    },
    /// Flick a list in real time and print positions until it comes to rest
    Fling {
        /// Release velocity in pixels per 60 Hz frame (positive scrolls down)
        #[arg(short = 'v', long, default_value_t = 30.0, allow_negative_numbers = true)]
        velocity: f64,
        /// Viewport height in pixels
        #[arg(long, default_value_t = 480.0)]
        viewport: f64,
        /// Content height in pixels
        #[arg(long, default_value_t = 5000.0)]
        content: f64,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => GlideConfig::load_from(path)?,
        None => GlideConfig::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Replay { script } => commands::replay::run(&script),
        Commands::Fling {
            velocity,
            viewport,
            content,
            timeout_secs,
        } => {
            let fling = commands::fling::Fling {
                velocity,
                viewport,
                content,
                timeout_secs,
            };
            commands::fling::run(&config, fling).await
        }
        Commands::Config { save } => commands::config::run(&config, save),
    }
}
