//! Reverse Trace population pass over the template analysis sheet.

use auto_oot_core::analysis::{analysis_date, reference_cells};
use auto_oot_core::config::Config;
use auto_oot_core::grid::{CellRef, CellValue, Column, Grid};
use auto_oot_core::trace::{map_rows, prepare_rows, read_header};
use chrono::NaiveDate;
use serde::Serialize;

use crate::prelude::*;
use crate::workbook::{Sheet, Workbook};

/// What the population pass did, for the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    pub asset_count: u32,
    /// Last sheet row holding an asset.
    pub last_row: u32,
    /// Data rows left visible after sampling.
    pub visible_rows: usize,
}

/// Fill the template's analysis and trace sheets from `trace`.
pub fn populate(
    workbook: &mut Workbook,
    trace: &Sheet,
    config: &Config,
    today: NaiveDate,
) -> Result<Population> {
    let schema = &config.trace;
    let settings = &config.analysis;

    // Raw copy of the trace.
    if !workbook.contains(&settings.trace_sheet) {
        workbook.create_sheet(&settings.trace_sheet, None)?;
    }
    workbook.sheet_mut(&settings.trace_sheet)?.copy_values_from(trace);

    let header = read_header(trace, schema);
    let mapped = map_rows(trace, schema);
    let prepared = prepare_rows(mapped.clone(), schema, settings.start_row, settings.end_row);
    let sort_width = settings.sort_width as usize;

    let sheet = workbook.sheet_mut(&settings.template_sheet)?;

    sheet.set_at(CellRef::new(1, Column::D), header.uid.clone());
    sheet.set_at(CellRef::new(2, Column::D), header.owning_lab.clone());
    sheet.set_at(CellRef::new(3, Column::D), header.previous_calibration.clone());
    sheet.set_at(CellRef::new(4, Column::D), header.current_calibration.clone());
    sheet.set_at(CellRef::new(5, Column::D), CellValue::Text(analysis_date(today)));
    sheet.set_at(CellRef::new(1, Column::H), CellValue::Number(header.asset_count as f64));

    let capacity = (settings.end_row - settings.start_row + 1) as usize;
    for (idx, (sorted, original)) in prepared.rows.iter().zip(&mapped).take(capacity).enumerate() {
        // Only the first `sort_width` columns take part in the sort.
        let row: Vec<CellValue> = (0..sorted.len().max(original.len()))
            .map(|col| {
                let source = if col < sort_width { sorted } else { original };
                source.get(col).cloned().unwrap_or_default()
            })
            .collect();
        sheet.write_row(settings.start_row + idx as u32, 1, &row);
    }

    for &row in &prepared.hidden {
        sheet.hide_row(row);
    }

    for (at, value) in reference_cells(settings, prepared.last_row) {
        sheet.set_at(at, value);
    }

    let date_column = schema.calibration_date.dest.index();
    for row in settings.start_row..=prepared.last_row {
        sheet.set_number_format(row, date_column, settings.date_format.clone());
    }

    let visible_rows = (settings.start_row..=prepared.last_row)
        .filter(|r| !prepared.hidden.contains(r))
        .filter(|&r| sheet.value(r, schema.asset.dest.index()).is_some())
        .count();

    log::info!(
        "populated {} trace row(s), {} visible, last data row {}",
        mapped.len(),
        visible_rows,
        prepared.last_row
    );

    Ok(Population {
        asset_count: header.asset_count,
        last_row: prepared.last_row,
        visible_rows,
    })
}
