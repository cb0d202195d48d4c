//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub content: ContentSettings,
    pub fonts: FontSettings,
    pub render: RenderSettings,
    pub staging: StagingSettings,
    pub logging: LoggingSettings,
}

/// Local content cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSettings {
    /// Root of the per-design cache directories
    pub cache_directory: PathBuf,
}

/// Font lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    /// Directory scanned for font files
    pub directory: Option<PathBuf>,
    /// PostScript names tried in order when a font is missing
    pub fallbacks: Vec<String>,
    /// Also index the fonts installed on the system
    pub system_fonts: bool,
}

/// Rendering engine process.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Engine executable; staging is unavailable while unset
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    /// Seconds to wait for each engine response
    pub request_timeout: u64,
}

/// Asset staging.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingSettings {
    pub max_concurrent_assets: usize,
    /// Layer depth below each root searched for assets (unset is unbounded)
    pub asset_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}
