//! medclass CLI: train, analyze and preprocess biomedical abstract corpora.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// medclass: biomedical abstract classification
#[derive(Parser, Debug)]
#[command(name = "medclass", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds medclass.toml, data, models and results)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Train a classifier and follow its progress (Ctrl-C stops the run)
    Train {
        /// Corpus CSV file, or a directory whose newest CSV is used
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Classify this title with the freshly trained model
        #[arg(long)]
        classify: Option<String>,

        /// Override the split seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Report label distribution, text statistics and data quality
    Analyze {
        /// Corpus CSV file, or a directory whose newest CSV is used
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Also write the report as JSON
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Normalize and vectorize a corpus and write the result as JSON
    Preprocess {
        /// Corpus CSV file, or a directory whose newest CSV is used
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = "data/processed/processed.json")]
        output: PathBuf,
    },

    /// Run one piece of text through the normalizer chain
    Normalize {
        text: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default medclass.toml into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = medclass_ml::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = config.paths.resolve(&workspace).logs_dir;
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "medclass.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command, config, &workspace).await
}
