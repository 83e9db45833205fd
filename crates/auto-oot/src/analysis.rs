//! Per-parameter analysis sheets.

use std::path::Path;

use auto_oot_core::analysis::{
    analysis_rules, final_evaluation_validation, freeze_cell, unique_sheet_name,
};
use auto_oot_core::config::AnalysisSettings;
use auto_oot_core::grid::{CellRef, Column};

use crate::prelude::*;
use crate::workbook::{Sheet, Workbook};

/// Conditional formats, the final evaluation dropdown, frozen panes and the
/// logo, applied to an analysis sheet.
pub fn dress(sheet: &mut Sheet, settings: &AnalysisSettings, last_row: u32, logo: Option<&Path>) {
    for rule in analysis_rules(settings) {
        sheet.add_conditional_format(rule);
    }
    sheet.add_validation(final_evaluation_validation(settings, last_row));
    sheet.set_freeze_panes(freeze_cell(settings));

    match logo {
        Some(path) if path.is_file() => sheet.insert_image(CellRef::new(1, Column::A), path),
        Some(path) => log::warn!("logo {} not found, sheet {:?} has none", path.display(), sheet.name),
        None => {}
    }
}

/// Clone the template analysis sheet for `parameter` and dress it.
/// Returns the name the new sheet was given.
pub fn add_parameter_sheet(
    workbook: &mut Workbook,
    parameter: &str,
    settings: &AnalysisSettings,
    last_row: u32,
    logo: Option<&Path>,
) -> Result<String> {
    let name = unique_sheet_name(parameter, &workbook.sheet_names());
    let sheet = workbook.copy_sheet(&settings.template_sheet, &name)?;
    dress(sheet, settings, last_row, logo);
    log::debug!("added analysis sheet {name:?} for {parameter:?}");
    Ok(name)
}
