//! Analysis sheet rule sets and sheet naming.
//!
//! The formatting rules are plain data here; the workbook layer applies them
//! in the order they are returned, which is also their precedence order.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::AnalysisSettings;
use crate::grid::{CellRange, CellRef, CellValue, Column};

/// Excel's sheet-name length limit.
pub const MAX_SHEET_NAME_LEN: usize = 31;

pub const DEFAULT_SHEET_NAME: &str = "Impact Copy";

const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Fill colors used by the rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Fill {
    Blue,
    Green,
    Yellow,
    Red,
}

impl Fill {
    pub fn rgb(self) -> u32 {
        match self {
            Fill::Blue => 0x00B0F0,
            Fill::Green => 0x00B050,
            Fill::Yellow => 0xFFFF00,
            Fill::Red => 0xFF0000,
        }
    }
}

/// A formula-driven conditional fill over a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalRule {
    pub range: CellRange,
    pub formula: String,
    pub fill: Fill,
}

/// A dropdown list validation fed by a formula range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListValidation {
    pub range: CellRange,
    pub source: String,
    pub allow_blank: bool,
}

const FINAL_EVALUATION: &[(&str, Fill)] = &[
    ("No Further Action Required", Fill::Green),
    ("Analysis performed; no further action required.", Fill::Green),
    ("No intersection; no further action required.", Fill::Green),
    ("FI Fails; TSM determination required.", Fill::Yellow),
    ("Unit fails analysis; TSM determination required.", Fill::Red),
    (
        "Significant preliminary finding & no data; TSM determination required.",
        Fill::Red,
    ),
];

const PRELIMINARY_SIGNIFICANCE: &[(&str, Fill)] = &[
    ("Not Significant", Fill::Green),
    ("Semi-Significant", Fill::Yellow),
    ("Significant", Fill::Red),
];

/// Column pairs that must be filled in before a row is complete.
const REQUIRED_INPUTS: &[(&str, &str)] = &[("M", "P"), ("R", "S"), ("Y", "Z")];

fn column(letters: &str) -> Column {
    Column::parse(letters).unwrap_or(Column::A)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn keyed_rules(
    first: Column,
    last: Column,
    key: Column,
    start: u32,
    end: u32,
    values: &[(&str, Fill)],
) -> Vec<ConditionalRule> {
    values
        .iter()
        .map(|(value, fill)| ConditionalRule {
            range: CellRange::new(first, start, last, end),
            formula: format!("=${}{}={}", key, start, quote(value)),
            fill: *fill,
        })
        .collect()
}

/// Row coloring by the final evaluation in column AI.
pub fn final_evaluation_rules(start: u32, end: u32) -> Vec<ConditionalRule> {
    keyed_rules(column("A"), column("AJ"), column("AI"), start, end, FINAL_EVALUATION)
}

/// Row coloring by the preliminary significance in column X.
pub fn preliminary_significance_rules(start: u32, end: u32) -> Vec<ConditionalRule> {
    keyed_rules(column("A"), column("X"), column("X"), start, end, PRELIMINARY_SIGNIFICANCE)
}

/// Blue fill on required input cells still left blank.
pub fn blank_is_incomplete_rules(start: u32, end: u32) -> Vec<ConditionalRule> {
    REQUIRED_INPUTS
        .iter()
        .map(|(first, last)| {
            let first = column(first);
            let anchor = CellRef::new(start, first);
            ConditionalRule {
                range: CellRange::new(first, start, column(last), end),
                formula: format!("=OR(ISBLANK({anchor}),{anchor}=\"\")"),
                fill: Fill::Blue,
            }
        })
        .collect()
}

/// All analysis rules in add order.
pub fn analysis_rules(settings: &AnalysisSettings) -> Vec<ConditionalRule> {
    let (start, end) = (settings.start_row, settings.end_row);
    let mut rules = final_evaluation_rules(start, end);
    rules.extend(preliminary_significance_rules(start, end));
    rules.extend(blank_is_incomplete_rules(start, end));
    rules
}

/// Dropdown over the final evaluation column, down to the last data row.
pub fn final_evaluation_validation(settings: &AnalysisSettings, last_row: u32) -> ListValidation {
    ListValidation {
        range: validation_range(settings, last_row),
        source: settings.validation_source.clone(),
        allow_blank: true,
    }
}

pub fn validation_range(settings: &AnalysisSettings, last_row: u32) -> CellRange {
    let last = last_row.max(settings.start_row);
    CellRange::column(column("AI"), settings.start_row, last)
}

/// Panes freeze below the table header and right of column A.
pub fn freeze_cell(settings: &AnalysisSettings) -> CellRef {
    CellRef::new(settings.start_row, Column::B)
}

/// Red highlight of failing results on the imported datasheet.
pub fn datasheet_failure_rule(result: Column, last_row: u32) -> ConditionalRule {
    ConditionalRule {
        range: CellRange::column(result, 1, last_row.max(1)),
        formula: format!("=${}1=\"Fail\"", result),
        fill: Fill::Red,
    }
}

/// Reference cells under the first data row: the first row is cleared and
/// each row below points back at it.
pub fn reference_cells(settings: &AnalysisSettings, last_row: u32) -> Vec<(CellRef, CellValue)> {
    let start = settings.start_row;
    let mut cells = Vec::new();

    for &col in &settings.reference_columns {
        cells.push((CellRef::new(start, col), CellValue::Text(String::new())));
        let anchor = format!("${}${}", col, start);
        for row in start + 1..=last_row {
            cells.push((
                CellRef::new(row, col),
                CellValue::Formula(format!("=IF({anchor}=\"\",\"\",{anchor})")),
            ));
        }
    }

    cells
}

/// Analysis date as written into the sheet header.
pub fn analysis_date(today: NaiveDate) -> String {
    today.format("%m/%d/%Y").to_string()
}

// ---------------------------------------------------------------------------
// Sheet names
// ---------------------------------------------------------------------------

fn trim_sheet_name(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\'')
}

/// Strip characters Excel rejects, trim, and cap the length. Excel also
/// rejects a leading or trailing apostrophe.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c))
        .collect();
    let capped: String = trim_sheet_name(&cleaned)
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let capped = trim_sheet_name(&capped).to_string();

    if capped.is_empty() {
        DEFAULT_SHEET_NAME.to_string()
    } else {
        capped
    }
}

/// Sanitized name that does not collide (case-insensitively) with `existing`.
/// Collisions get a ` (n)` suffix, truncating the base to stay within limits.
pub fn unique_sheet_name<S: AsRef<str>>(name: &str, existing: &[S]) -> String {
    let base = sanitize_sheet_name(name);
    let taken = |candidate: &str| {
        existing
            .iter()
            .any(|e| e.as_ref().to_lowercase() == candidate.to_lowercase())
    };

    if !taken(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let suffix = format!(" ({n})");
        let room = MAX_SHEET_NAME_LEN - suffix.chars().count();
        let stem: String = base.chars().take(room).collect();
        let candidate = format!("{}{}", stem.trim_end(), suffix);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
