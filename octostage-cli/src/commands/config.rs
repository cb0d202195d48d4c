//! Configuration management CLI commands.

use clap::Subcommand;
use octostage::config::{config_file_path, ConfigFile};
use std::path::Path;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Path => run_path(&path),
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Show => run_show(&path),
    }
}

fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    println!("Configuration ({})", path.display());
    println!("======================");
    println!();
    println!("[content]");
    println!("  cache_directory       = {}", config.content.cache_directory.display());
    println!("[fonts]");
    println!("  directory             = {}", display_optional(config.fonts.directory.as_deref()));
    println!("  fallbacks             = {}", config.fonts.fallbacks.join(", "));
    println!("  system_fonts          = {}", config.fonts.system_fonts);
    println!("[render]");
    println!("  command               = {}", display_optional(config.render.command.as_deref()));
    println!("  args                  = {}", config.render.args.join(" "));
    println!("  request_timeout       = {}s", config.render.request_timeout);
    println!("[staging]");
    println!("  max_concurrent_assets = {}", config.staging.max_concurrent_assets);
    println!(
        "  asset_depth           = {}",
        config
            .staging
            .asset_depth
            .map(|depth| depth.to_string())
            .unwrap_or_else(|| "(unlimited)".to_string())
    );
    println!("[logging]");
    println!("  file                  = {}", config.logging.file.display());
    Ok(())
}

fn display_optional(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
