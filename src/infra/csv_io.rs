use crate::common::constants::{LATITUDE_COLUMN, LONGITUDE_COLUMN, SPREADSHEET_EXTENSIONS};
use crate::common::error::{EnrichError, Result};
use crate::domain::{InputRow, InputTable};
use crate::infra::xlsx_input::read_workbook;
use crate::pipeline::FlatTable;
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Load the coordinate table from CSV, or from the first sheet of an
/// `.xlsx`/`.xls` workbook.
pub fn load_input(path: &Path) -> Result<InputTable> {
    let table = if is_spreadsheet(path) {
        read_workbook(path)?
    } else {
        let file = File::open(path).map_err(|e| {
            EnrichError::InvalidInput(format!("cannot open input '{}': {}", path.display(), e))
        })?;
        read_table(file)?
    };
    info!("📥 Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SPREADSHEET_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

pub fn read_table<R: Read>(reader: R) -> Result<InputTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells = Vec::new();
    for record in reader.records() {
        cells.push(record?.iter().map(str::to_string).collect());
    }
    build_table(columns, cells)
}

/// Attach parsed coordinates to raw rows. A blank or non-numeric coordinate
/// keeps the row with `None`; only a missing coordinate column is an error.
pub(crate) fn build_table(columns: Vec<String>, cells: Vec<Vec<String>>) -> Result<InputTable> {
    let lat_col = find_column(&columns, LATITUDE_COLUMN)?;
    let lng_col = find_column(&columns, LONGITUDE_COLUMN)?;

    let rows = cells
        .into_iter()
        .enumerate()
        .map(|(index, fields)| InputRow {
            index,
            latitude: parse_coordinate(&fields, lat_col, index, LATITUDE_COLUMN),
            longitude: parse_coordinate(&fields, lng_col, index, LONGITUDE_COLUMN),
            fields,
        })
        .collect();

    Ok(InputTable { columns, rows })
}

fn find_column(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| EnrichError::InvalidInput(format!("input has no '{name}' column")))
}

fn parse_coordinate(fields: &[String], col: usize, row: usize, name: &str) -> Option<f64> {
    let raw = fields.get(col).map(|f| f.trim()).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!("Row {}: {} '{}' is not a number; its lookups will be skipped", row, name, raw);
            None
        }
    }
}

pub fn write_output(path: &Path, table: &FlatTable) -> Result<()> {
    let file = File::create(path)?;
    write_table(file, table)?;
    info!(
        "💾 Wrote {} rows x {} columns to {}",
        table.rows.len(),
        table.columns.len(),
        path.display()
    );
    Ok(())
}

/// Write the flat table as CSV with the union schema as header.
pub fn write_table<W: Write>(writer: W, table: &FlatTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer.flush()?;
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        // numbers, booleans, and compact JSON for arrays/objects
        other => other.to_string(),
    }
}
