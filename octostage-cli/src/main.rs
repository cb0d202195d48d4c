//! octostage CLI - command-line interface
//!
//! Stages cached octopus designs into a rendering engine process.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;
use commands::manifest::ManifestArgs;
use commands::stage::StageArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "octostage")]
#[command(version = octostage::VERSION)]
#[command(about = "Stage octopus design artboards into a rendering engine", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.octostage/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make artboards ready in the rendering engine
    Stage(StageArgs),

    /// List the pages and artboards of a cached design
    Manifest(ManifestArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config(command) => commands::config::run(command, cli.config.as_deref()),
        Commands::Stage(args) => {
            let runner = CliRunner::new(cli.config.as_deref(), cli.debug)?;
            commands::stage::run(args, &runner)
        }
        Commands::Manifest(args) => {
            let runner = CliRunner::new(cli.config.as_deref(), cli.debug)?;
            commands::manifest::run(args, &runner)
        }
    }
}
