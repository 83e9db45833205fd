//! In-memory workbook document.
//!
//! The template is loaded into this model, every pipeline step edits it, and
//! the result is written once at the end. Coordinates are 1-indexed like the
//! [`Grid`] trait; the exporter converts to the writer's 0-indexed cells.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use auto_oot_core::analysis::{ConditionalRule, ListValidation};
use auto_oot_core::grid::{CellRef, CellValue, Grid};

use crate::prelude::*;

pub mod export;
pub mod import;

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
    number_formats: BTreeMap<(u32, u16), String>,
    hidden_rows: BTreeSet<u32>,
    conditional_formats: Vec<ConditionalRule>,
    validations: Vec<ListValidation>,
    images: Vec<(CellRef, PathBuf)>,
    freeze_panes: Option<CellRef>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Store a value; writing an empty value clears the cell.
    pub fn set_value(&mut self, row: u32, column: u16, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, column));
        } else {
            self.cells.insert((row, column), value);
        }
    }

    pub fn set_at(&mut self, at: CellRef, value: CellValue) {
        self.set_value(at.row, at.column.index(), value);
    }

    /// Write `values` left to right starting at `(row, first_column)`.
    pub fn write_row(&mut self, row: u32, first_column: u16, values: &[CellValue]) {
        for (offset, value) in values.iter().enumerate() {
            self.set_value(row, first_column + offset as u16, value.clone());
        }
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter().map(|(&(r, c), v)| (r, c, v))
    }

    pub fn set_number_format(&mut self, row: u32, column: u16, format: impl Into<String>) {
        self.number_formats.insert((row, column), format.into());
    }

    pub fn number_format(&self, row: u32, column: u16) -> Option<&str> {
        self.number_formats.get(&(row, column)).map(String::as_str)
    }

    pub fn hide_row(&mut self, row: u32) {
        self.hidden_rows.insert(row);
    }

    pub fn hidden_rows(&self) -> &BTreeSet<u32> {
        &self.hidden_rows
    }

    pub fn add_conditional_format(&mut self, rule: ConditionalRule) {
        self.conditional_formats.push(rule);
    }

    pub fn conditional_formats(&self) -> &[ConditionalRule] {
        &self.conditional_formats
    }

    pub fn add_validation(&mut self, validation: ListValidation) {
        self.validations.push(validation);
    }

    pub fn validations(&self) -> &[ListValidation] {
        &self.validations
    }

    pub fn insert_image(&mut self, at: CellRef, path: &Path) {
        self.images.push((at, path.to_path_buf()));
    }

    pub fn images(&self) -> &[(CellRef, PathBuf)] {
        &self.images
    }

    pub fn set_freeze_panes(&mut self, at: CellRef) {
        self.freeze_panes = Some(at);
    }

    pub fn freeze_panes(&self) -> Option<CellRef> {
        self.freeze_panes
    }

    /// Replace every value with the values of `source`. Formatting and rules
    /// of this sheet are kept.
    pub fn copy_values_from(&mut self, source: &Sheet) {
        self.cells = source.cells.clone();
    }

    /// Sheet contents as rows of values, row 1 first.
    pub fn to_rows(&self) -> Vec<Vec<CellValue>> {
        let width = self.max_column() as usize;
        (1..=self.max_row())
            .map(|row| {
                (1..=width as u16)
                    .map(|col| self.value(row, col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Build a sheet from rows of values, row 1 first.
    pub fn from_rows(name: impl Into<String>, rows: &[Vec<CellValue>]) -> Self {
        let mut sheet = Sheet::new(name);
        for (idx, values) in rows.iter().enumerate() {
            sheet.write_row(idx as u32 + 1, 1, values);
        }
        sheet
    }
}

impl Grid for Sheet {
    fn max_row(&self) -> u32 {
        self.cells.keys().map(|&(r, _)| r).max().unwrap_or(0)
    }

    fn max_column(&self) -> u16 {
        self.cells.keys().map(|&(_, c)| c).max().unwrap_or(0)
    }

    fn value(&self, row: u32, column: u16) -> Option<&CellValue> {
        self.cells.get(&(row, column))
    }
}

/// An ordered set of uniquely named sheets, one of them active.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    active: usize,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Sheet names compare case-insensitively, like Excel's.
    pub fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.sheets.iter().position(|s| s.name.to_lowercase() == wanted)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        let idx = self
            .position(name)
            .ok_or_else(|| Error::MissingSheet(name.to_string()))?;
        Ok(&self.sheets[idx])
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        let idx = self
            .position(name)
            .ok_or_else(|| Error::MissingSheet(name.to_string()))?;
        Ok(&mut self.sheets[idx])
    }

    /// Insert a sheet at `index` (appended when `None`).
    pub fn insert_sheet(&mut self, sheet: Sheet, index: Option<usize>) -> Result<&mut Sheet> {
        if self.contains(&sheet.name) {
            return Err(Error::Workbook(format!("sheet {:?} already exists", sheet.name)).into());
        }
        let idx = index.unwrap_or(self.sheets.len()).min(self.sheets.len());
        if idx <= self.active && !self.sheets.is_empty() {
            self.active += 1;
        }
        self.sheets.insert(idx, sheet);
        Ok(&mut self.sheets[idx])
    }

    pub fn create_sheet(&mut self, name: &str, index: Option<usize>) -> Result<&mut Sheet> {
        self.insert_sheet(Sheet::new(name), index)
    }

    /// Remove a sheet. The active sheet moves to the first one when the
    /// removed sheet was active.
    pub fn remove_sheet(&mut self, name: &str) -> Result<Sheet> {
        let idx = self
            .position(name)
            .ok_or_else(|| Error::MissingSheet(name.to_string()))?;
        let sheet = self.sheets.remove(idx);
        if self.active == idx {
            self.active = 0;
        } else if self.active > idx {
            self.active -= 1;
        }
        Ok(sheet)
    }

    /// Append a copy of `source` under `new_name`.
    pub fn copy_sheet(&mut self, source: &str, new_name: &str) -> Result<&mut Sheet> {
        let mut copy = self.sheet(source)?.clone();
        copy.name = new_name.to_string();
        self.insert_sheet(copy, None)
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        self.active = self
            .position(name)
            .ok_or_else(|| Error::MissingSheet(name.to_string()))?;
        Ok(())
    }

    pub fn active_index(&self) -> usize {
        self.active
    }
}
