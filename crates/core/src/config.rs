//! TOML configuration model.
//!
//! Every section falls back to the stock layout of the FSM OOT template, so
//! an empty file (or no file at all) is a valid configuration. Column letters
//! are parsed while deserializing; the remaining cross-field checks run in
//! [`Config::validate`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::Column;
use crate::segment::{SliceMarkers, Strategy};
use crate::trace::TraceSchema;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub files: FilesConfig,
    pub trace: TraceSchema,
    pub analysis: AnalysisSettings,
    pub datasheet: DatasheetSettings,
    pub header_bars: HeaderBarSettings,
    pub table: TableSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub template: PathBuf,
    pub logo: PathBuf,
    /// Root of the `<year>/<lab>/<uid>` tree.
    pub oots_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("FSMOOTSIA.xlsm"),
            logo: PathBuf::from("Tek_logo.png"),
            oots_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub reverse_trace: String,
    pub datasheet: String,
    pub output_prefix: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            reverse_trace: "Reverse Trace.xlsx".to_string(),
            datasheet: "DS.pdf".to_string(),
            output_prefix: "OOT_".to_string(),
        }
    }
}

impl FilesConfig {
    pub fn output_file_name(&self, uid: &str) -> String {
        format!("{}{}.xlsx", self.output_prefix, uid)
    }
}

/// Layout of the template's analysis sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub template_sheet: String,
    pub trace_sheet: String,
    pub datasheet_sheet: String,
    pub start_row: u32,
    pub end_row: u32,
    pub sort_width: u16,
    pub date_format: String,
    pub reference_columns: Vec<Column>,
    pub validation_source: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            template_sheet: "Impact Analysis".to_string(),
            trace_sheet: "Reverse Trace".to_string(),
            datasheet_sheet: "Datasheet".to_string(),
            start_row: 10,
            end_row: 5008,
            sort_width: 12,
            date_format: "MM/DD/YYYY".to_string(),
            reference_columns: ["M", "N", "O", "P"]
                .iter()
                .filter_map(|c| Column::parse(c).ok())
                .collect(),
            validation_source: "=$AD$1:$AD$6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasheetSettings {
    pub strategy: Strategy,
    pub start_marker: String,
    pub end_marker: String,
    pub result_column: Column,
}

impl Default for DatasheetSettings {
    fn default() -> Self {
        let markers = SliceMarkers::default();
        Self {
            strategy: Strategy::default(),
            start_marker: markers.start,
            end_marker: markers.end,
            result_column: Column::D,
        }
    }
}

impl DatasheetSettings {
    pub fn markers(&self) -> SliceMarkers {
        SliceMarkers {
            start: self.start_marker.clone(),
            end: self.end_marker.clone(),
        }
    }
}

/// Geometry and color thresholds for shaded header bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderBarSettings {
    pub min_width_ratio: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub inset: f32,
    pub grey_tolerance: f32,
    pub grey_min: f32,
    pub grey_max: f32,
}

impl Default for HeaderBarSettings {
    fn default() -> Self {
        Self {
            min_width_ratio: 0.8,
            min_height: 8.0,
            max_height: 60.0,
            inset: 1.5,
            grey_tolerance: 0.05,
            grey_min: 0.2,
            grey_max: 0.9,
        }
    }
}

/// Text-alignment table detection tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub min_rows: usize,
    pub min_columns: usize,
    pub max_columns: usize,
    pub y_tolerance_factor: f32,
    pub min_alignment_ratio: f32,
    pub min_column_gap: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 20,
            y_tolerance_factor: 0.3,
            min_alignment_ratio: 0.25,
            min_column_gap: 10.0,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.start_row == 0 || a.start_row >= a.end_row {
            return Err(ConfigError::Invalid(format!(
                "analysis.start_row ({}) must be at least 1 and below analysis.end_row ({})",
                a.start_row, a.end_row
            )));
        }
        if a.sort_width == 0 {
            return Err(ConfigError::Invalid("analysis.sort_width must be at least 1".into()));
        }
        if a.template_sheet.trim().is_empty() {
            return Err(ConfigError::Invalid("analysis.template_sheet is empty".into()));
        }
        if !a.validation_source.starts_with('=') {
            return Err(ConfigError::Invalid(format!(
                "analysis.validation_source must be a formula, got {:?}",
                a.validation_source
            )));
        }

        if self.trace.first_data_row == 0 {
            return Err(ConfigError::Invalid("trace.first_data_row must be at least 1".into()));
        }

        let d = &self.datasheet;
        if d.start_marker.is_empty() || d.end_marker.is_empty() {
            return Err(ConfigError::Invalid("datasheet markers must not be empty".into()));
        }

        let b = &self.header_bars;
        if b.min_height > b.max_height {
            return Err(ConfigError::Invalid(format!(
                "header_bars.min_height ({}) exceeds header_bars.max_height ({})",
                b.min_height, b.max_height
            )));
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&b.grey_min) || !unit.contains(&b.grey_max) || b.grey_min > b.grey_max {
            return Err(ConfigError::Invalid(format!(
                "header_bars grey band [{}, {}] must lie within [0, 1]",
                b.grey_min, b.grey_max
            )));
        }
        if !(0.0..=1.0).contains(&b.min_width_ratio) {
            return Err(ConfigError::Invalid("header_bars.min_width_ratio must lie within [0, 1]".into()));
        }

        let t = &self.table;
        if t.min_columns > t.max_columns {
            return Err(ConfigError::Invalid(format!(
                "table.min_columns ({}) exceeds table.max_columns ({})",
                t.min_columns, t.max_columns
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.analysis.start_row, 10);
        assert_eq!(config.datasheet.result_column, Column::D);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = Config::from_toml_str(
            r#"
            [datasheet]
            strategy = "keyword"
            result_column = "E"

            [trace]
            asset = ["X", "A"]
            "#,
        )
        .unwrap();

        assert_eq!(config.datasheet.strategy, Strategy::Keyword);
        assert_eq!(config.datasheet.result_column.letters(), "E");
        assert_eq!(config.datasheet.start_marker, "Function");
        assert_eq!(config.trace.asset.source.letters(), "X");
        assert_eq!(config.trace.product.source.letters(), "K");
    }

    #[test]
    fn bad_column_letters_fail_at_load() {
        let err = Config::from_toml_str("[datasheet]\nresult_column = \"4\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = Config::from_toml_str("[unknown]\nkey = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inverted_rows_are_invalid() {
        let err = Config::from_toml_str("[analysis]\nstart_row = 50\nend_row = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn grey_band_outside_unit_interval_is_invalid() {
        let err = Config::from_toml_str("[header_bars]\ngrey_max = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn output_file_name_uses_prefix() {
        assert_eq!(FilesConfig::default().output_file_name("U-42"), "OOT_U-42.xlsx");
    }
}
