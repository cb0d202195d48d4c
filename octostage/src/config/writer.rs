//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let font_directory = config
        .fonts
        .directory
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let command = config
        .render
        .command
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let asset_depth = config
        .staging
        .asset_depth
        .map(|depth| depth.to_string())
        .unwrap_or_default();

    format!(
        r#"[content]
; Root of the local design cache. Each design is stored in <cache_directory>/<design-id>/
cache_directory = {}

[fonts]
; Directory scanned (recursively) for font files, in addition to system fonts
directory = {}
; Comma-separated PostScript names tried in order when a font is not installed
fallbacks = {}
; Also index the fonts installed on this system (true/false)
system_fonts = {}

[render]
; Rendering engine executable. It receives one JSON command per line on stdin
; and answers with one JSON response per line on stdout.
command = {}
; Extra arguments passed to the engine (whitespace-separated)
args = {}
; Seconds to wait for each engine response (default: 30)
request_timeout = {}

[staging]
; Maximum number of bitmap and font assets staged concurrently (default: 8)
max_concurrent_assets = {}
; Layer depth searched for assets below each root layer (empty = unlimited)
asset_depth = {}

[logging]
; Log file, cleared at the start of each session
file = {}
"#,
        path_to_string(&config.content.cache_directory),
        font_directory,
        config.fonts.fallbacks.join(", "),
        config.fonts.system_fonts,
        command,
        config.render.args.join(" "),
        config.render.request_timeout,
        config.staging.max_concurrent_assets,
        asset_depth,
        path_to_string(&config.logging.file),
    )
}

/// Render a path for the config file, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}
