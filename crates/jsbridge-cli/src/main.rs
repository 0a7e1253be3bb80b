use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

use commands::{call::CallCommand, run::RunCommand};

#[derive(Parser)]
#[command(name = "jsbridge", version, about = "Run scripts against the jsbridge host bridge")]
struct Cli {
    /// Path to a jsbridge.toml (default: search current and parent directories)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a script with a host console bound
    Run(RunCommand),
    /// Evaluate a script, then call a method on one of its globals
    Call(CallCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(cmd) => cmd.run(&config),
        Commands::Call(cmd) => cmd.run(&config),
    }
}
