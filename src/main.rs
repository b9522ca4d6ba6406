use anyhow::{Context, Result};
use clap::Parser;
use file_sorter::{Command, Settings, run_cli};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "file-sorter")]
#[command(version, about = "Move files into folders chosen by extension rules")]
struct Cli {
    /// Path to settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the rules file (overrides settings)
    #[arg(short, long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let log_level = if cli.verbose {
        "debug"
    } else {
        settings.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("FILE_SORTER_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let rules_path = match cli.rules {
        Some(path) => path,
        None => settings.rules_path()?,
    };

    run_cli(cli.command, &rules_path)
}
