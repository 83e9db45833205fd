//! Datasheet PDF import: body table, slice and parameter report.

use std::path::Path;

use auto_oot_core::config::Config;
use auto_oot_core::failure::{find_oot_parameters, ParameterReport};
use auto_oot_core::grid::CellValue;
use auto_oot_core::segment::{slice_rows, Strategy};
use pdf::parser::bars::header_texts;
use pdf::{Datasheet, HeaderCandidate, RawRow};

use crate::config::{bar_detector, table_detector};
use crate::prelude::*;

/// Everything the run pipeline needs from the PDF.
#[derive(Debug, Clone)]
pub struct DatasheetImport {
    /// Rows between the start and end markers, written to the Datasheet sheet.
    pub rows: Vec<Vec<CellValue>>,
    /// Deduplicated header-bar labels (empty for the keyword strategy).
    pub bars: Vec<String>,
    pub report: ParameterReport,
}

pub fn to_values(body: Vec<RawRow>) -> Vec<Vec<CellValue>> {
    body.into_iter()
        .map(|row| row.into_iter().map(CellValue::from).collect())
        .collect()
}

/// Slice the body and evaluate it with `strategy`.
pub fn analyze(
    body: Vec<RawRow>,
    bars: Vec<String>,
    config: &Config,
    strategy: Strategy,
) -> DatasheetImport {
    let settings = &config.datasheet;
    let rows = slice_rows(&to_values(body), &settings.markers());
    if rows.is_empty() {
        log::warn!("start marker {:?} not found in the datasheet", settings.start_marker);
    }

    let report = find_oot_parameters(rows.as_slice(), strategy, &bars, settings.result_column);

    DatasheetImport { rows, bars, report }
}

pub fn open(path: &Path) -> Result<Datasheet> {
    if !path.is_file() {
        return Err(Error::MissingInput(format!("datasheet {} not found", path.display())).into());
    }
    Datasheet::open(path).wrap_err_with(|| format!("Failed to read datasheet {}", path.display()))
}

pub fn header_bars(datasheet: &Datasheet, config: &Config) -> Vec<HeaderCandidate> {
    datasheet.header_bars(&bar_detector(&config.header_bars))
}

/// Read `path` and produce the import. An empty body is an error the caller
/// reports before skipping the datasheet step.
pub fn import(path: &Path, config: &Config, strategy: Strategy) -> Result<DatasheetImport> {
    let datasheet = open(path)?;
    log::info!("datasheet {} has {} page(s)", path.display(), datasheet.page_count());

    let body = datasheet.body(&table_detector(&config.table));
    if body.is_empty() {
        return Err(Error::MissingInput(format!(
            "could not extract data from {}",
            path.display()
        ))
        .into());
    }

    let bars = match strategy {
        Strategy::Geometric => header_texts(&header_bars(&datasheet, config)),
        Strategy::Keyword => Vec::new(),
    };

    Ok(analyze(body, bars, config, strategy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cells: &[&str]) -> RawRow {
        cells
            .iter()
            .map(|c| Some(c.to_string()).filter(|c| !c.is_empty()))
            .collect()
    }

    /// Two pages worth of body: cover text, then the test table.
    fn body() -> Vec<RawRow> {
        vec![
            raw(&["Calibration Certificate", "", "", ""]),
            raw(&["Function", "Spec", "Measured", "Result"]),
            raw(&["Voltage Accuracy", "", "", ""]),
            raw(&["1 V", "1%", "0.5%", "Pass"]),
            raw(&["10 V", "1%", "0.7%", "Pass"]),
            raw(&["Frequency Response", "", "", ""]),
            raw(&["1 kHz", "3 dB", "1 dB", "Pass"]),
            raw(&["1 MHz", "3 dB", "4 dB", "Fail"]),
            raw(&["Decision Rule", "Simple acceptance", "", ""]),
            raw(&["Signature", "", "", ""]),
        ]
    }

    #[test]
    fn geometric_import_flags_failing_section() {
        let bars = vec!["Voltage Accuracy".to_string(), "Frequency Response".to_string()];
        let import = analyze(body(), bars, &Config::default(), Strategy::Geometric);

        assert_eq!(import.rows.len(), 7);
        assert_eq!(import.rows[0][0], CellValue::from("Function"));
        assert_eq!(import.report.strategy, Some(Strategy::Geometric));
        assert_eq!(import.report.flagged(), vec!["Frequency Response"]);
    }

    #[test]
    fn keyword_import_uses_row_shape() {
        let import = analyze(body(), Vec::new(), &Config::default(), Strategy::Keyword);
        let names: Vec<_> = import.report.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Voltage Accuracy", "Frequency Response"]);
        assert_eq!(import.report.flagged(), vec!["Frequency Response"]);
    }

    #[test]
    fn geometric_without_bars_falls_back() {
        let import = analyze(body(), Vec::new(), &Config::default(), Strategy::Geometric);
        assert_eq!(import.report.strategy, Some(Strategy::Keyword));
        assert_eq!(import.report.flagged(), vec!["Frequency Response"]);
    }

    #[test]
    fn missing_start_marker_yields_no_rows() {
        let body = vec![raw(&["Notes", "", "", ""]), raw(&["x", "y", "z", "Fail"])];
        let import = analyze(body, Vec::new(), &Config::default(), Strategy::Keyword);
        assert!(import.rows.is_empty());
        assert!(import.report.flagged().is_empty());
    }

    #[test]
    fn missing_pdf_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = import(&dir.path().join("DS.pdf"), &Config::default(), Strategy::Geometric)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
