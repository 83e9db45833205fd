//! Writing the workbook model with `rust_xlsxwriter`.

use std::collections::HashMap;
use std::path::Path;

use auto_oot_core::analysis::{ConditionalRule, ListValidation};
use auto_oot_core::grid::{CellRange, CellValue};
use rust_xlsxwriter::{
    Color, ConditionalFormatFormula, DataValidation, Format, Formula, Image,
    Workbook as XlsxWorkbook, Worksheet,
};

use super::{Sheet, Workbook};
use crate::prelude::*;

/// Number format for date cells that carry none of their own.
pub const DEFAULT_DATE_FORMAT: &str = "mm/dd/yyyy";

/// 0-based `(first_row, first_col, last_row, last_col)`.
fn zero_based(range: &CellRange) -> (u32, u16, u32, u16) {
    (
        range.first.row - 1,
        range.first.column.index() - 1,
        range.last.row - 1,
        range.last.column.index() - 1,
    )
}

pub fn save(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx
            .add_worksheet()
            .set_name(&sheet.name)
            .wrap_err_with(|| format!("Failed to create sheet {:?}", sheet.name))?;

        write_sheet(worksheet, sheet)
            .wrap_err_with(|| format!("Failed to write sheet {:?}", sheet.name))?;
    }

    if !workbook.sheets().is_empty() {
        xlsx.worksheet_from_index(workbook.active_index())?
            .set_active(true);
    }

    xlsx.save(path)
        .wrap_err_with(|| format!("Failed to save {}", path.display()))?;

    log::info!("saved {} sheet(s) to {}", workbook.sheets().len(), path.display());
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<()> {
    let mut formats: HashMap<String, Format> = HashMap::new();

    for (row, col, value) in sheet.cells() {
        let (r, c) = (row - 1, col - 1);
        let num_format = sheet.number_format(row, col).or(match value {
            CellValue::DateTime(_) => Some(DEFAULT_DATE_FORMAT),
            _ => None,
        });
        let format = num_format.map(|nf| {
            formats
                .entry(nf.to_string())
                .or_insert_with(|| Format::new().set_num_format(nf))
                .clone()
        });

        match (value, &format) {
            (CellValue::Empty, _) => {}
            (CellValue::Text(s), None) => {
                worksheet.write_string(r, c, s)?;
            }
            (CellValue::Text(s), Some(f)) => {
                worksheet.write_string_with_format(r, c, s, f)?;
            }
            (CellValue::Number(n) | CellValue::DateTime(n), None) => {
                worksheet.write_number(r, c, *n)?;
            }
            (CellValue::Number(n) | CellValue::DateTime(n), Some(f)) => {
                worksheet.write_number_with_format(r, c, *n, f)?;
            }
            (CellValue::Bool(b), None) => {
                worksheet.write_boolean(r, c, *b)?;
            }
            (CellValue::Bool(b), Some(f)) => {
                worksheet.write_boolean_with_format(r, c, *b, f)?;
            }
            (CellValue::Formula(src), None) => {
                worksheet.write_formula(r, c, src.as_str())?;
            }
            (CellValue::Formula(src), Some(f)) => {
                worksheet.write_formula_with_format(r, c, src.as_str(), f)?;
            }
        }
    }

    // Formats on cells without a value still matter (e.g. the date column
    // of rows that have not been filled in).
    for (&(row, col), nf) in sheet.number_formats.iter() {
        if sheet.cells.contains_key(&(row, col)) {
            continue;
        }
        let format = formats
            .entry(nf.clone())
            .or_insert_with(|| Format::new().set_num_format(nf));
        worksheet.write_blank(row - 1, col - 1, format)?;
    }

    for &row in sheet.hidden_rows() {
        worksheet.set_row_hidden(row - 1)?;
    }

    for rule in sheet.conditional_formats() {
        add_conditional_format(worksheet, rule)?;
    }

    for validation in sheet.validations() {
        add_validation(worksheet, validation)?;
    }

    for (at, path) in sheet.images() {
        let image = Image::new(path)
            .wrap_err_with(|| format!("Failed to load image {}", path.display()))?;
        worksheet.insert_image(at.row - 1, at.column.index() - 1, &image)?;
    }

    if let Some(at) = sheet.freeze_panes() {
        worksheet.set_freeze_panes(at.row - 1, at.column.index() - 1)?;
    }

    Ok(())
}

fn add_conditional_format(worksheet: &mut Worksheet, rule: &ConditionalRule) -> Result<()> {
    let fill = Format::new().set_background_color(Color::RGB(rule.fill.rgb()));
    let conditional = ConditionalFormatFormula::new()
        .set_rule(rule.formula.as_str())
        .set_format(&fill);

    let (r0, c0, r1, c1) = zero_based(&rule.range);
    worksheet.add_conditional_format(r0, c0, r1, c1, &conditional)?;
    Ok(())
}

fn add_validation(worksheet: &mut Worksheet, validation: &ListValidation) -> Result<()> {
    let rule = DataValidation::new()
        .allow_list_formula(Formula::new(&validation.source))
        .ignore_blank(validation.allow_blank);

    let (r0, c0, r1, c1) = zero_based(&validation.range);
    worksheet.add_data_validation(r0, c0, r1, c1, &rule)?;
    Ok(())
}
