//! Reading workbooks with `calamine`.
//!
//! Values and formulas survive the trip; cell styles, existing conditional
//! formats and embedded images of the source file are not readable through
//! calamine and are dropped.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use auto_oot_core::grid::CellValue;
use calamine::{open_workbook_auto, Data, Reader, Sheets};

use super::{Sheet, Workbook};
use crate::prelude::*;

/// Convert a calamine cell into a [`CellValue`].
pub fn convert(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Load every sheet of a workbook file, in workbook order.
pub fn load(path: &Path) -> Result<Workbook> {
    let mut source = open_workbook_auto(path)
        .wrap_err_with(|| format!("Failed to open workbook {}", path.display()))?;

    let mut workbook = Workbook::new();
    for name in source.sheet_names() {
        let sheet = read_sheet(&mut source, &name)?;
        log::debug!("loaded sheet {:?} ({} cells)", name, sheet.cells().count());
        workbook.insert_sheet(sheet, None)?;
    }

    if workbook.sheets().is_empty() {
        return Err(Error::Workbook(format!("{} contains no sheets", path.display())).into());
    }

    Ok(workbook)
}

/// Load a single sheet by name.
pub fn load_sheet(path: &Path, name: &str) -> Result<Sheet> {
    let mut source = open_workbook_auto(path)
        .wrap_err_with(|| format!("Failed to open workbook {}", path.display()))?;

    let actual = source
        .sheet_names()
        .iter()
        .find(|n| n.to_lowercase() == name.to_lowercase())
        .cloned()
        .ok_or_else(|| Error::MissingSheet(name.to_string()))?;

    read_sheet(&mut source, &actual)
}

fn read_sheet(source: &mut Sheets<BufReader<File>>, name: &str) -> Result<Sheet> {
    let mut sheet = Sheet::new(name);

    let range = source
        .worksheet_range(name)
        .wrap_err_with(|| format!("Failed to read sheet {name:?}"))?;
    // Ranges start at the first used cell, not necessarily A1.
    if let Some((row0, col0)) = range.start() {
        for (r, c, data) in range.used_cells() {
            sheet.set_value(row0 + r as u32 + 1, (col0 as usize + c + 1) as u16, convert(data));
        }
    }

    // Formulas replace their cached values.
    if let Ok(formulas) = source.worksheet_formula(name) {
        if let Some((row0, col0)) = formulas.start() {
            for (r, c, formula) in formulas.used_cells() {
                if formula.is_empty() {
                    continue;
                }
                sheet.set_value(
                    row0 + r as u32 + 1,
                    (col0 as usize + c + 1) as u16,
                    CellValue::Formula(format!("={formula}")),
                );
            }
        }
    }

    Ok(sheet)
}
