use std::collections::{BTreeMap, HashSet};

use super::layout::TextSpan;
use crate::text::normalize;
use crate::types::RawRow;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// A detected table region within a page: its column boundaries and the
/// row data that belongs to it.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Sorted X positions that mark the left edge of each column.
    pub columns: Vec<f32>,
    pub rows: Vec<TableRowData>,
}

/// A single row inside a detected table, carrying the Y coordinate and the
/// text spans that belong to this row.
#[derive(Debug, Clone)]
pub struct TableRowData {
    pub y: f32,
    pub spans: Vec<TextSpan>,
}

/// Tuning knobs for the table detection heuristic.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows required for a region to qualify as a table.
    pub min_rows: usize,
    pub min_columns: usize,
    /// Maximum number of columns allowed (guards against noise).
    pub max_columns: usize,
    /// `y_tolerance = median_font_size * factor`.
    pub y_tolerance_factor: f32,
    /// Fraction of rows that must have a span starting near a candidate
    /// column position for it to be accepted as a column boundary.
    pub min_alignment_ratio: f32,
    /// Minimum horizontal gap (in PDF points) between two adjacent column
    /// boundaries.
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 20,
            y_tolerance_factor: 0.3,
            // Datasheet sections mix full rows with one-cell header lines.
            min_alignment_ratio: 0.25,
            min_column_gap: 10.0,
        }
    }
}

/// Detect a table in the spans of one page.
///
/// The algorithm works as follows:
/// 1. Compute Y-tolerance from the median font size of all spans.
/// 2. Group spans into rows by Y coordinate.
/// 3. Detect column boundaries that appear frequently across rows.
/// 4. If enough columns and rows satisfy the alignment ratio the region is
///    accepted as a table.
pub fn detect_tables(spans: &[TextSpan], config: &TableDetectorConfig) -> Vec<DetectedTable> {
    if spans.is_empty() {
        return Vec::new();
    }

    let y_tolerance = compute_y_tolerance(spans, config.y_tolerance_factor);
    let rows = group_into_rows(spans, y_tolerance);

    if rows.len() < config.min_rows {
        return Vec::new();
    }

    let columns = detect_columns(&rows, config);

    if columns.len() < config.min_columns || columns.len() > config.max_columns {
        return Vec::new();
    }

    let aligned_rows = rows
        .iter()
        .filter(|row| {
            let aligned_cols = columns
                .iter()
                .filter(|&&col_x| {
                    row.spans
                        .iter()
                        .any(|s| (s.x - col_x).abs() < config.min_column_gap)
                })
                .count();
            aligned_cols >= columns.len().div_ceil(2)
        })
        .count();

    let ratio = aligned_rows as f32 / rows.len() as f32;
    if ratio < config.min_alignment_ratio {
        return Vec::new();
    }

    vec![DetectedTable { columns, rows }]
}

/// Group text spans into rows by their Y coordinate.
///
/// Two spans belong to the same row when their Y values differ by no more
/// than `y_tolerance`. Rows come back in reading order: top of the page
/// (largest Y) first.
pub fn group_into_rows(spans: &[TextSpan], y_tolerance: f32) -> Vec<TableRowData> {
    let mut sorted: Vec<&TextSpan> = spans.iter().collect();
    sorted.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows: Vec<TableRowData> = Vec::new();
    let mut current_spans: Vec<TextSpan> = Vec::new();
    let mut current_y = 0.0;

    for span in sorted {
        if !current_spans.is_empty() && (span.y - current_y).abs() > y_tolerance {
            rows.push(finish_row(std::mem::take(&mut current_spans)));
        }
        if current_spans.is_empty() {
            current_y = span.y;
        }
        current_spans.push(span.clone());
    }

    if !current_spans.is_empty() {
        rows.push(finish_row(current_spans));
    }

    rows
}

fn finish_row(mut spans: Vec<TextSpan>) -> TableRowData {
    let avg_y = spans.iter().map(|s| s.y).sum::<f32>() / spans.len() as f32;
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    TableRowData { y: avg_y, spans }
}

/// Detect column boundaries from a set of table rows.
///
/// X-start positions are bucketed to whole points, each row votes once per
/// bucket, and buckets reaching `min_alignment_ratio` of the rows survive.
/// Survivors closer than `min_column_gap` to the previous one are dropped.
pub fn detect_columns(rows: &[TableRowData], config: &TableDetectorConfig) -> Vec<f32> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut x_freq: BTreeMap<i32, (f32, usize)> = BTreeMap::new();
    for row in rows {
        let mut seen_buckets: HashSet<i32> = HashSet::new();
        for span in &row.spans {
            let bucket = span.x.round() as i32;
            if seen_buckets.insert(bucket) {
                let entry = x_freq.entry(bucket).or_insert((0.0, 0));
                entry.0 += span.x;
                entry.1 += 1;
            }
        }
    }

    let min_count = ((rows.len() as f32 * config.min_alignment_ratio).ceil() as usize).max(1);
    let candidates: Vec<f32> = x_freq
        .values()
        .filter(|(_, count)| *count >= min_count)
        .map(|(sum, count)| sum / *count as f32)
        .collect();

    let mut columns: Vec<f32> = Vec::new();
    for x in candidates {
        if let Some(&last) = columns.last() {
            if (x - last).abs() < config.min_column_gap {
                continue;
            }
        }
        columns.push(x);
    }

    columns
}

/// Flatten a detected table into raw rows, one cell per column.
///
/// Spans are assigned to the nearest column boundary; several spans in one
/// cell are joined with a space. Cells are normalized and empty cells become
/// `None`. Every row is kept, header lines included.
pub fn table_rows(table: &DetectedTable) -> Vec<RawRow> {
    let num_cols = table.columns.len();
    if num_cols == 0 {
        return Vec::new();
    }

    table
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = vec![String::new(); num_cols];
            for span in &row.spans {
                let cell = &mut cells[assign_column(span.x, &table.columns)];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(&span.text);
            }
            cells
                .into_iter()
                .map(|c| Some(normalize(&c)).filter(|c| !c.is_empty()))
                .collect()
        })
        .collect()
}

fn compute_y_tolerance(spans: &[TextSpan], factor: f32) -> f32 {
    if spans.is_empty() {
        return 1.0;
    }
    let mut sizes: Vec<f32> = spans.iter().map(|s| s.font_size).collect();
    sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sizes[sizes.len() / 2];
    (median * factor).max(1.0)
}

/// Index of the column boundary closest to `x`.
fn assign_column(x: f32, columns: &[f32]) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}
