use crate::common::error::{EnrichError, Result};
use crate::domain::InputTable;
use crate::infra::csv_io::build_table;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

/// Read the first sheet of a workbook. The first row is the header; every
/// cell is kept as its display text so passthrough columns match the sheet.
pub fn read_workbook(path: &Path) -> Result<InputTable> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook.sheet_names().first().cloned().unwrap_or_default();
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        EnrichError::InvalidInput(format!("workbook '{}' has no sheets", path.display()))
    })??;
    debug!("Reading sheet '{}' ({:?} cells)", sheet_name, range.get_size());

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| {
            EnrichError::InvalidInput(format!("sheet '{}' has no header row", sheet_name))
        })?
        .iter()
        .map(cell_text)
        .collect();
    let cells = rows.map(|row| row.iter().map(cell_text).collect()).collect();

    build_table(columns, cells)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
