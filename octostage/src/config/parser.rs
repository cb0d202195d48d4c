//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [content] section
    if let Some(section) = ini.section(Some("content")) {
        if let Some(v) = non_empty(section.get("cache_directory")) {
            config.content.cache_directory = expand_tilde(v);
        }
    }

    // [fonts] section
    if let Some(section) = ini.section(Some("fonts")) {
        if let Some(v) = section.get("directory") {
            config.fonts.directory = non_empty(Some(v)).map(expand_tilde);
        }
        if let Some(v) = section.get("fallbacks") {
            config.fonts.fallbacks = v
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = section.get("system_fonts") {
            config.fonts.system_fonts = parse_bool(v).ok_or_else(|| ConfigFileError::InvalidValue {
                section: "fonts".to_string(),
                key: "system_fonts".to_string(),
                value: v.to_string(),
                reason: "must be true or false".to_string(),
            })?;
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = section.get("command") {
            config.render.command = non_empty(Some(v)).map(expand_tilde);
        }
        if let Some(v) = section.get("args") {
            config.render.args = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = section.get("request_timeout") {
            config.render.request_timeout = v
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "render".to_string(),
                    key: "request_timeout".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                })?;
        }
    }

    // [staging] section
    if let Some(section) = ini.section(Some("staging")) {
        if let Some(v) = section.get("max_concurrent_assets") {
            config.staging.max_concurrent_assets = v
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "staging".to_string(),
                    key: "max_concurrent_assets".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer".to_string(),
                })?;
        }
        if let Some(v) = section.get("asset_depth") {
            config.staging.asset_depth = match non_empty(Some(v)) {
                None => None,
                Some(depth) => Some(depth.parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "staging".to_string(),
                    key: "asset_depth".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer or empty".to_string(),
                })?),
            };
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
