//! Failure matching: reduce a segmented datasheet to the parameters that need
//! an impact analysis.

use log::{debug, info, warn};
use serde::Serialize;

use crate::grid::{CellValue, Column, Grid};
use crate::segment::{
    derive_regions, map_headers_to_rows, row_shape_headers, HeaderMatch, Region, Strategy,
};
use crate::text::fold;

/// The only result text that counts as a failure.
pub const FAILURE_MARKER: &str = "fail";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    /// Row of the header itself, `None` when the header never matched.
    pub header_row: Option<u32>,
    pub region: Option<Region>,
    pub requires_analysis: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterReport {
    pub strategy: Option<Strategy>,
    pub parameters: Vec<Parameter>,
}

impl ParameterReport {
    /// Names of flagged parameters, in discovery order, without repeats.
    pub fn flagged(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for p in self.parameters.iter().filter(|p| p.requires_analysis) {
            if !out.contains(&p.name.as_str()) {
                out.push(&p.name);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Exact match after whitespace normalization and case folding.
/// `"Fail*"` and `"Failed"` are not failures.
pub fn is_failure_marker(value: &CellValue) -> bool {
    value
        .as_text()
        .map(|text| fold(&text) == FAILURE_MARKER)
        .unwrap_or(false)
}

pub fn region_has_failure<G: Grid + ?Sized>(grid: &G, region: &Region, result: Column) -> bool {
    if region.is_empty() {
        return false;
    }
    region
        .rows()
        .filter_map(|row| grid.value(row, result.index()))
        .any(is_failure_marker)
}

/// Evaluate every header against its region.
pub fn build_report<G: Grid + ?Sized>(
    grid: &G,
    headers: &[HeaderMatch],
    result: Column,
) -> Vec<Parameter> {
    let regions = derive_regions(headers, grid.max_row());

    headers
        .iter()
        .map(|header| {
            let region = regions
                .iter()
                .find(|(name, row, _)| *name == header.name && Some(*row) == header.row)
                .map(|(_, _, region)| *region);
            let requires_analysis = region
                .as_ref()
                .map(|r| region_has_failure(grid, r, result))
                .unwrap_or(false);

            debug!(
                "parameter {:?} header_row={:?} region={:?} fail={}",
                header.name, header.row, region, requires_analysis
            );

            Parameter {
                name: header.name.clone(),
                header_row: header.row,
                region,
                requires_analysis,
            }
        })
        .collect()
}

/// Full segmentation and matching over the sliced datasheet.
///
/// `bar_headers` are the deduplicated header-bar labels from the PDF. With
/// [`Strategy::Geometric`] and no bars, discovery falls back to row shape.
pub fn find_oot_parameters<G: Grid + ?Sized>(
    grid: &G,
    strategy: Strategy,
    bar_headers: &[String],
    result: Column,
) -> ParameterReport {
    let (used, headers) = match strategy {
        Strategy::Geometric if !bar_headers.is_empty() => {
            (Strategy::Geometric, map_headers_to_rows(grid, bar_headers))
        }
        Strategy::Geometric => {
            warn!("no header bars detected, falling back to keyword headers");
            (Strategy::Keyword, row_shape_headers(grid, Column::A, Column::B))
        }
        Strategy::Keyword => (Strategy::Keyword, row_shape_headers(grid, Column::A, Column::B)),
    };

    let parameters = build_report(grid, &headers, result);
    let report = ParameterReport {
        strategy: Some(used),
        parameters,
    };

    info!(
        "{} parameter(s) found with {} strategy, {} flagged",
        report.parameters.len(),
        used,
        report.flagged().len()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: u32) -> Vec<Vec<CellValue>> {
        (1..=rows)
            .map(|r| {
                vec![
                    CellValue::from(format!("{r} V")),
                    CellValue::Number(r as f64),
                    CellValue::Number(r as f64 + 0.1),
                    CellValue::from("Pass"),
                ]
            })
            .collect()
    }

    fn set(rows: &mut [Vec<CellValue>], row: u32, col: usize, value: CellValue) {
        let r = &mut rows[row as usize - 1];
        if r.len() < col {
            r.resize(col, CellValue::Empty);
        }
        r[col - 1] = value;
    }

    #[test]
    fn failure_marker_is_exact() {
        for ok in ["Fail", "fail", " Fail ", "FAIL", "\tfail\n"] {
            assert!(is_failure_marker(&CellValue::from(ok)), "{ok:?}");
        }
        for not in ["Fail*", "Failed", "Pass", "", "fa il"] {
            assert!(!is_failure_marker(&CellValue::from(not)), "{not:?}");
        }
        assert!(!is_failure_marker(&CellValue::Empty));
        assert!(!is_failure_marker(&CellValue::Number(0.0)));
    }

    #[test]
    fn empty_region_never_fails() {
        let mut rows = sheet(5);
        set(&mut rows, 3, 4, CellValue::from("Fail"));
        let region = Region { start: 4, end: 3 };
        assert!(!region_has_failure(rows.as_slice(), &region, Column::D));
    }

    #[test]
    fn failure_outside_result_column_is_ignored() {
        let mut rows = sheet(5);
        set(&mut rows, 3, 3, CellValue::from("Fail"));
        let region = Region { start: 1, end: 5 };
        assert!(!region_has_failure(rows.as_slice(), &region, Column::D));
    }

    #[test]
    fn only_region_with_failure_is_flagged() {
        let mut rows = sheet(30);
        set(&mut rows, 5, 1, CellValue::from("Voltage Accuracy"));
        set(&mut rows, 20, 1, CellValue::from("Frequency Response"));
        set(&mut rows, 22, 4, CellValue::from("Fail"));

        let bars = vec!["Voltage Accuracy".to_string(), "Frequency Response".to_string()];
        let report = find_oot_parameters(rows.as_slice(), Strategy::Geometric, &bars, Column::D);

        assert_eq!(report.strategy, Some(Strategy::Geometric));
        assert_eq!(report.flagged(), vec!["Frequency Response"]);
        assert_eq!(report.parameters[0].region, Some(Region { start: 6, end: 19 }));
        assert_eq!(report.parameters[1].region, Some(Region { start: 21, end: 30 }));
    }

    #[test]
    fn unmatched_header_is_never_flagged() {
        let mut rows = sheet(10);
        set(&mut rows, 2, 1, CellValue::from("Alpha"));
        set(&mut rows, 4, 4, CellValue::from("fail"));

        let bars = vec!["Ghost".to_string(), "Alpha".to_string()];
        let report = find_oot_parameters(rows.as_slice(), Strategy::Geometric, &bars, Column::D);

        assert_eq!(report.parameters[0].header_row, None);
        assert!(!report.parameters[0].requires_analysis);
        assert_eq!(report.flagged(), vec!["Alpha"]);
    }

    #[test]
    fn geometric_without_bars_falls_back_to_keyword() {
        let mut rows = sheet(8);
        set(&mut rows, 1, 1, CellValue::from("DC Voltage"));
        set(&mut rows, 1, 2, CellValue::Empty);
        set(&mut rows, 1, 3, CellValue::Empty);
        set(&mut rows, 1, 4, CellValue::Empty);
        set(&mut rows, 6, 4, CellValue::from("FAIL"));

        let report = find_oot_parameters(rows.as_slice(), Strategy::Geometric, &[], Column::D);

        assert_eq!(report.strategy, Some(Strategy::Keyword));
        assert_eq!(report.flagged(), vec!["DC Voltage"]);
    }

    #[test]
    fn keyword_strategy_ignores_bars() {
        let mut rows = sheet(4);
        set(&mut rows, 2, 2, CellValue::Empty);
        let bars = vec!["1 V".to_string()];
        let report = find_oot_parameters(rows.as_slice(), Strategy::Keyword, &bars, Column::D);

        assert_eq!(report.strategy, Some(Strategy::Keyword));
        assert_eq!(report.parameters.len(), 1);
        assert_eq!(report.parameters[0].name, "2 V");
    }

    #[test]
    fn report_serializes_to_json() {
        let report = ParameterReport {
            strategy: Some(Strategy::Keyword),
            parameters: vec![Parameter {
                name: "Rise Time".into(),
                header_row: Some(3),
                region: Some(Region { start: 4, end: 9 }),
                requires_analysis: true,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "keyword");
        assert_eq!(json["parameters"][0]["region"]["end"], 9);
    }
}
