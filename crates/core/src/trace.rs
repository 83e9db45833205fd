//! Reverse Trace schema and the pure column mapping into the analysis sheet.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grid::{CellValue, Column, Grid};

/// A source column in the trace and its destination in the analysis sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Column, Column)", into = "(Column, Column)")]
pub struct ColumnPair {
    pub source: Column,
    pub dest: Column,
}

impl From<(Column, Column)> for ColumnPair {
    fn from((source, dest): (Column, Column)) -> Self {
        ColumnPair { source, dest }
    }
}

impl From<ColumnPair> for (Column, Column) {
    fn from(pair: ColumnPair) -> Self {
        (pair.source, pair.dest)
    }
}

/// Named layout of the "Reverse Trace - UID" sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSchema {
    pub sheet: String,
    pub first_data_row: u32,
    pub uid: Column,
    pub owning_lab: Column,
    pub previous_calibration: Column,
    pub current_calibration: Column,
    pub asset: ColumnPair,
    pub product: ColumnPair,
    pub calibration_date: ColumnPair,
    pub passthrough: Vec<ColumnPair>,
}

fn col(letters: &str) -> Column {
    match Column::parse(letters) {
        Ok(c) => c,
        Err(_) => Column::A,
    }
}

fn pair(source: &str, dest: &str) -> ColumnPair {
    ColumnPair {
        source: col(source),
        dest: col(dest),
    }
}

impl Default for TraceSchema {
    fn default() -> Self {
        Self {
            sheet: "Reverse Trace - UID".to_string(),
            first_data_row: 2,
            uid: col("D"),
            owning_lab: col("F"),
            previous_calibration: col("G"),
            current_calibration: col("H"),
            asset: pair("J", "A"),
            product: pair("K", "B"),
            calibration_date: pair("L", "C"),
            passthrough: vec![
                pair("O", "D"),
                pair("Q", "F"),
                pair("R", "G"),
                pair("S", "I"),
                pair("M", "J"),
                pair("N", "K"),
                pair("P", "L"),
            ],
        }
    }
}

impl TraceSchema {
    /// Every mapping, named fields first.
    pub fn pairs(&self) -> impl Iterator<Item = &ColumnPair> {
        [&self.asset, &self.product, &self.calibration_date]
            .into_iter()
            .chain(self.passthrough.iter())
    }

    /// Width of a mapped row (highest destination column).
    pub fn mapped_width(&self) -> u16 {
        self.pairs().map(|p| p.dest.index()).max().unwrap_or(0)
    }
}

/// Values copied from the first data row of the trace into the sheet header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceHeader {
    pub uid: CellValue,
    pub owning_lab: CellValue,
    pub previous_calibration: CellValue,
    pub current_calibration: CellValue,
    /// Number of rows below the header row.
    pub asset_count: u32,
}

fn cell<G: Grid + ?Sized>(grid: &G, row: u32, column: Column) -> CellValue {
    grid.value(row, column.index()).cloned().unwrap_or_default()
}

pub fn read_header<G: Grid + ?Sized>(grid: &G, schema: &TraceSchema) -> TraceHeader {
    let row = schema.first_data_row;
    TraceHeader {
        uid: cell(grid, row, schema.uid),
        owning_lab: cell(grid, row, schema.owning_lab),
        previous_calibration: cell(grid, row, schema.previous_calibration),
        current_calibration: cell(grid, row, schema.current_calibration),
        asset_count: grid.max_row().saturating_sub(schema.first_data_row - 1),
    }
}

/// One output row per trace data row, laid out by destination column.
pub fn map_rows<G: Grid + ?Sized>(grid: &G, schema: &TraceSchema) -> Vec<Vec<CellValue>> {
    let width = schema.mapped_width() as usize;

    (schema.first_data_row..=grid.max_row())
        .map(|row| {
            let mut out = vec![CellValue::Empty; width];
            for p in schema.pairs() {
                out[p.dest.index() as usize - 1] = cell(grid, row, p.source);
            }
            out
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sort and sampling
// ---------------------------------------------------------------------------

/// Numbers sort before text; empty values sort last.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    fn rank(v: &CellValue) -> u8 {
        match v {
            _ if v.is_empty() => 2,
            CellValue::Number(_) | CellValue::DateTime(_) | CellValue::Bool(_) => 0,
            _ => 1,
        }
    }

    match (a, b) {
        (CellValue::Number(x) | CellValue::DateTime(x), CellValue::Number(y) | CellValue::DateTime(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => match rank(a).cmp(&rank(b)) {
            Ordering::Equal => a.as_text().cmp(&b.as_text()),
            other => other,
        },
    }
}

/// Mapped rows placed in the analysis sheet, sorted, with their visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRows {
    /// Rows in output order; index 0 lands on `start_row`.
    pub rows: Vec<Vec<CellValue>>,
    /// Last sheet row whose asset cell is non-empty (`start_row` when none).
    pub last_row: u32,
    /// Sheet rows to hide.
    pub hidden: BTreeSet<u32>,
}

/// Sort the data rows by product and compute hidden rows.
///
/// Only rows inside `start_row..=end_row` take part. The stable sort keeps
/// trace order within a product; after sorting, rows with an empty asset
/// and rows repeating the previous row's product are hidden, so each
/// product shows once.
pub fn prepare_rows(
    mut rows: Vec<Vec<CellValue>>,
    schema: &TraceSchema,
    start_row: u32,
    end_row: u32,
) -> AnalysisRows {
    let asset = schema.asset.dest.index() as usize - 1;
    let product = schema.product.dest.index() as usize - 1;
    let capacity = (end_row.saturating_sub(start_row) + 1) as usize;

    let is_blank = |row: &Vec<CellValue>, idx: usize| row.get(idx).map_or(true, CellValue::is_empty);

    let data_len = rows
        .iter()
        .take(capacity)
        .rposition(|r| !is_blank(r, asset))
        .map(|i| i + 1)
        .unwrap_or(0);
    let last_row = if data_len == 0 {
        start_row
    } else {
        start_row + data_len as u32 - 1
    };

    rows[..data_len].sort_by(|a, b| {
        compare_values(
            a.get(product).unwrap_or(&CellValue::Empty),
            b.get(product).unwrap_or(&CellValue::Empty),
        )
    });

    let mut hidden = BTreeSet::new();
    for sheet_row in start_row..=end_row {
        let idx = (sheet_row - start_row) as usize;
        match rows.get(idx) {
            Some(row) if !is_blank(row, asset) => {}
            _ => {
                hidden.insert(sheet_row);
            }
        }
    }

    for sheet_row in start_row + 1..=last_row {
        let idx = (sheet_row - start_row) as usize;
        let current = rows[idx].get(product).unwrap_or(&CellValue::Empty);
        let previous = rows[idx - 1].get(product).unwrap_or(&CellValue::Empty);
        if current == previous {
            hidden.insert(sheet_row);
        }
    }

    AnalysisRows {
        rows,
        last_row,
        hidden,
    }
}
