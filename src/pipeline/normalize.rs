use crate::common::constants::{
    poi_category_column, DEMOGRAPHICS_PREFIX, GEO_ID_COLUMN, POI_COUNT_COLUMN, POI_SUCCESS_COLUMN,
    SCORES_PREFIX,
};
use crate::common::error::{EnrichError, Result};
use crate::domain::{EnrichmentRecord, InputTable};
use crate::pipeline::flatten::{flatten_value, flatten_value_drivers, Leaves};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The final rectangular table. Every row has one cell per column;
/// `Value::Null` marks an empty cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl FlatTable {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell lookup by row position and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(col))
    }
}

/// Union of per-row column sets, in first-seen order across rows.
struct ColumnGroup {
    columns: Vec<String>,
    seen: HashSet<String>,
    rows: Vec<HashMap<String, Value>>,
}

impl ColumnGroup {
    fn from_rows(per_row: Vec<Leaves>) -> Self {
        let mut group = ColumnGroup {
            columns: Vec::new(),
            seen: HashSet::new(),
            rows: Vec::with_capacity(per_row.len()),
        };
        for leaves in per_row {
            let mut cells = HashMap::with_capacity(leaves.len());
            for (path, value) in leaves {
                if group.seen.insert(path.clone()) {
                    group.columns.push(path.clone());
                }
                if cells.insert(path.clone(), value).is_some() {
                    debug!("Path '{}' repeats within one row; keeping the later value", path);
                }
            }
            group.rows.push(cells);
        }
        group
    }

    fn emit(&self, row: usize, missing: &Value, out: &mut Vec<Value>) {
        let cells = &self.rows[row];
        for column in &self.columns {
            out.push(cells.get(column).cloned().unwrap_or_else(|| missing.clone()));
        }
    }
}

/// Build the flat output table from the original rows and their records.
///
/// Columns: original columns, `new_geo_id`, `poi_success`, `pois.count`, then
/// the `scores.*`, `demographics.*` and `value_drivers.*` groups, then one
/// `poi_<category>_count` per category seen in any row. Input columns named
/// like a generated column are replaced by it. Rows keep their input order
/// and none are dropped.
pub fn normalize(table: &InputTable, records: &[EnrichmentRecord]) -> Result<FlatTable> {
    if table.rows.len() != records.len() {
        return Err(EnrichError::InvalidInput(format!(
            "{} input rows but {} enrichment records",
            table.rows.len(),
            records.len()
        )));
    }

    let scores = ColumnGroup::from_rows(
        records
            .iter()
            .map(|r| r.scores.as_ref().map(|v| flatten_value(SCORES_PREFIX, v)).unwrap_or_default())
            .collect(),
    );
    let demographics = ColumnGroup::from_rows(
        records
            .iter()
            .map(|r| {
                r.demographics
                    .as_ref()
                    .map(|v| flatten_value(DEMOGRAPHICS_PREFIX, v))
                    .unwrap_or_default()
            })
            .collect(),
    );
    let value_drivers = ColumnGroup::from_rows(
        records
            .iter()
            .map(|r| r.value_drivers.as_ref().map(flatten_value_drivers).unwrap_or_default())
            .collect(),
    );
    let categories = ColumnGroup::from_rows(
        records
            .iter()
            .map(|r| {
                r.poi_category_counts
                    .iter()
                    .map(|(category, count)| (poi_category_column(category), Value::from(*count)))
                    .collect::<Leaves>()
            })
            .collect(),
    );

    let mut generated: HashSet<&str> = HashSet::new();
    generated.extend([GEO_ID_COLUMN, POI_SUCCESS_COLUMN, POI_COUNT_COLUMN]);
    for group in [&scores, &demographics, &value_drivers, &categories] {
        generated.extend(group.columns.iter().map(String::as_str));
    }
    let kept: Vec<usize> = (0..table.columns.len())
        .filter(|&i| !generated.contains(table.columns[i].as_str()))
        .collect();
    if kept.len() < table.columns.len() {
        debug!(
            "Replacing {} input columns with freshly generated ones",
            table.columns.len() - kept.len()
        );
    }

    let mut columns: Vec<String> = kept.iter().map(|&i| table.columns[i].clone()).collect();
    columns.push(GEO_ID_COLUMN.to_string());
    columns.push(POI_SUCCESS_COLUMN.to_string());
    columns.push(POI_COUNT_COLUMN.to_string());
    for group in [&scores, &demographics, &value_drivers, &categories] {
        columns.extend(group.columns.iter().cloned());
    }
    debug!(
        "Flattened {} scores, {} demographics, {} value driver and {} POI category columns",
        scores.columns.len(),
        demographics.columns.len(),
        value_drivers.columns.len(),
        categories.columns.len()
    );

    let zero = Value::from(0);
    let mut rows = Vec::with_capacity(records.len());
    for (i, (input, record)) in table.rows.iter().zip(records).enumerate() {
        let mut cells = Vec::with_capacity(columns.len());
        // short rows in the input still fill every original column
        cells.extend(kept.iter().map(|&c| {
            input
                .fields
                .get(c)
                .map(|f| Value::String(f.clone()))
                .unwrap_or(Value::Null)
        }));

        cells.push(record.geo_id.clone().map(Value::String).unwrap_or(Value::Null));
        cells.push(Value::from(u8::from(record.poi_fetch_succeeded)));
        cells.push(Value::from(record.pois.len()));

        scores.emit(i, &Value::Null, &mut cells);
        demographics.emit(i, &Value::Null, &mut cells);
        value_drivers.emit(i, &Value::Null, &mut cells);
        categories.emit(i, &zero, &mut cells);

        rows.push(cells);
    }

    Ok(FlatTable { columns, rows })
}
