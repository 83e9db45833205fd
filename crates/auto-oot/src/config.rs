use std::fs;
use std::path::{Path, PathBuf};

use auto_oot_core::config::{Config, HeaderBarSettings, TableSettings};
use pdf::parser::bars::BarDetectorConfig;
use pdf::parser::table::TableDetectorConfig;

use crate::prelude::*;

const CONFIG_FILE: &str = "config.toml";

/// `<config_dir>/auto-oot/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("auto-oot").join(CONFIG_FILE))
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, the per-user file is used when
/// present and the built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => path,
            None => {
                log::debug!("no configuration file, using defaults");
                return Ok(Config::default());
            }
        },
    };

    load_file(&path)
}

pub fn load_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read configuration {}", path.display()))?;
    let config = Config::from_toml_str(&text)
        .wrap_err_with(|| format!("Invalid configuration {}", path.display()))?;
    log::info!("configuration loaded from {}", path.display());
    Ok(config)
}

pub fn bar_detector(settings: &HeaderBarSettings) -> BarDetectorConfig {
    BarDetectorConfig {
        min_width_ratio: settings.min_width_ratio,
        min_height: settings.min_height,
        max_height: settings.max_height,
        inset: settings.inset,
        grey_tolerance: settings.grey_tolerance,
        grey_min: settings.grey_min,
        grey_max: settings.grey_max,
    }
}

pub fn table_detector(settings: &TableSettings) -> TableDetectorConfig {
    TableDetectorConfig {
        min_rows: settings.min_rows,
        min_columns: settings.min_columns,
        max_columns: settings.max_columns,
        y_tolerance_factor: settings.y_tolerance_factor,
        min_alignment_ratio: settings.min_alignment_ratio,
        min_column_gap: settings.min_column_gap,
    }
}
