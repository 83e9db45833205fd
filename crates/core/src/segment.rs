//! Section segmentation of an extracted datasheet table.
//!
//! The pipeline is: isolate the "Function" .. "Decision Rule" slice of the
//! raw body, discover the parameter headers (shaded bars from the PDF, or the
//! row shape of the sliced table), map each header to a row, and derive the
//! contiguous row region each parameter owns.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::grid::{CellValue, Column, Grid};
use crate::text::{fold, normalize_text};

/// How parameter headers are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Shaded header bars drawn in the PDF, located in the sheet by text.
    #[default]
    Geometric,
    /// Rows whose first column has text and whose second column is empty.
    Keyword,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Geometric => write!(f, "geometric"),
            Strategy::Keyword => write!(f, "keyword"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "geometric" => Ok(Strategy::Geometric),
            "keyword" => Ok(Strategy::Keyword),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Slice isolation
// ---------------------------------------------------------------------------

/// Literal markers bounding the region of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceMarkers {
    pub start: String,
    pub end: String,
}

impl Default for SliceMarkers {
    fn default() -> Self {
        Self {
            start: "Function".to_string(),
            end: "Decision Rule".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceState {
    SearchingStart,
    Recording,
    Done,
}

impl SliceState {
    /// Advance on one row. The end marker is only honored on rows after the
    /// start row, so a row carrying both markers opens the slice.
    pub fn step(self, row: &[CellValue], markers: &SliceMarkers) -> SliceState {
        match self {
            SliceState::SearchingStart if row_contains(row, &markers.start) => {
                SliceState::Recording
            }
            SliceState::Recording if row_contains(row, &markers.end) => SliceState::Done,
            other => other,
        }
    }
}

/// Case-sensitive containment of `marker` in any non-empty cell.
pub fn row_contains(row: &[CellValue], marker: &str) -> bool {
    row.iter()
        .filter(|cell| !cell.is_empty())
        .filter_map(CellValue::as_text)
        .any(|text| text.contains(marker))
}

/// Inclusive 1-indexed row bounds of an isolated slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceBounds {
    pub first: usize,
    pub last: usize,
}

/// Locate the slice inside `rows`. Returns `None` when the start marker never
/// appears. Without an end marker the slice runs to the last row.
pub fn isolate_slice(rows: &[Vec<CellValue>], markers: &SliceMarkers) -> Option<SliceBounds> {
    let mut state = SliceState::SearchingStart;
    let mut first = None;
    let mut last = None;

    for (idx, row) in rows.iter().enumerate() {
        let next = state.step(row, markers);
        match (state, next) {
            (SliceState::SearchingStart, SliceState::Recording) => first = Some(idx + 1),
            (SliceState::Recording, SliceState::Done) => break,
            _ => {}
        }
        state = next;
        if state == SliceState::Recording {
            last = Some(idx + 1);
        }
    }

    match (first, last) {
        (Some(first), Some(last)) => Some(SliceBounds { first, last }),
        _ => None,
    }
}

/// The rows of the slice, cloned out of `rows`.
pub fn slice_rows(rows: &[Vec<CellValue>], markers: &SliceMarkers) -> Vec<Vec<CellValue>> {
    match isolate_slice(rows, markers) {
        Some(bounds) => rows[bounds.first - 1..bounds.last].to_vec(),
        None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Header discovery
// ---------------------------------------------------------------------------

/// A parameter header and the destination row it landed on, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatch {
    pub name: String,
    pub row: Option<u32>,
}

/// Normalize and drop repeats, keeping first-seen order. Empty labels are
/// discarded.
pub fn dedupe_preserving_order<I, S>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for header in headers {
        let text = normalize_text(header.as_ref());
        if text.is_empty() {
            continue;
        }
        if seen.insert(text.clone()) {
            out.push(text);
        }
    }

    out
}

/// Headers discovered from row shape: text in `label` and nothing in `blank`.
///
/// Each header carries its own row; a label seen twice keeps its first row.
pub fn row_shape_headers<G: Grid + ?Sized>(grid: &G, label: Column, blank: Column) -> Vec<HeaderMatch> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for row in 1..=grid.max_row() {
        let label_text = grid
            .value(row, label.index())
            .filter(|v| !v.is_empty())
            .and_then(CellValue::as_text)
            .map(|t| normalize_text(&t))
            .unwrap_or_default();
        if label_text.is_empty() {
            continue;
        }

        let blank_is_empty = grid
            .value(row, blank.index())
            .map_or(true, CellValue::is_empty);
        if !blank_is_empty {
            continue;
        }

        if seen.insert(label_text.clone()) {
            out.push(HeaderMatch {
                name: label_text,
                row: Some(row),
            });
        }
    }

    out
}

/// Concatenated, case-folded text of a row (`" | "` joined).
fn row_haystack<G: Grid + ?Sized>(grid: &G, row: u32) -> String {
    fold(&grid.row_texts(row).join(" | "))
}

/// Map each header to the first row at or after the previous match whose
/// text contains it. Matches are strictly increasing; headers that never
/// match keep `row: None` and do not advance the scan.
pub fn map_headers_to_rows<G: Grid + ?Sized>(grid: &G, headers: &[String]) -> Vec<HeaderMatch> {
    let max_row = grid.max_row();
    let mut scan_from = 1;
    let mut out = Vec::with_capacity(headers.len());

    for header in headers {
        let needle = fold(header);
        let row = if needle.is_empty() {
            None
        } else {
            (scan_from..=max_row).find(|&r| row_haystack(grid, r).contains(&needle))
        };

        match row {
            Some(r) => scan_from = r + 1,
            None => debug!("header {header:?} did not match any row"),
        }

        out.push(HeaderMatch {
            name: header.clone(),
            row,
        });
    }

    out
}

// ---------------------------------------------------------------------------
// Region derivation
// ---------------------------------------------------------------------------

/// Inclusive 1-indexed row interval owned by one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub start: u32,
    pub end: u32,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Regions between consecutive matched headers; the last one absorbs the
/// table tail up to `max_row`. Unmatched headers get no region.
pub fn derive_regions(matches: &[HeaderMatch], max_row: u32) -> Vec<(String, u32, Region)> {
    let matched: Vec<(&str, u32)> = matches
        .iter()
        .filter_map(|m| m.row.map(|r| (m.name.as_str(), r)))
        .collect();

    matched
        .iter()
        .enumerate()
        .map(|(i, (name, row))| {
            let end = match matched.get(i + 1) {
                Some((_, next)) => next.saturating_sub(1),
                None => max_row,
            };
            (
                name.to_string(),
                *row,
                Region {
                    start: row + 1,
                    end,
                },
            )
        })
        .collect()
}
