use crate::common::error::{EnrichError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One coordinate row from the input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputRow {
    /// 0-based position in the input table
    pub index: usize,
    /// `None` when the cell is blank or not a number
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Every original cell, in header order
    pub fields: Vec<String>,
}

impl InputRow {
    /// Both coordinates, if the row has usable ones.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// The loaded input: header plus rows in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputTable {
    pub columns: Vec<String>,
    pub rows: Vec<InputRow>,
}

impl InputTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The remote lookups performed for every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Geography,
    Scores,
    Demographics,
    ValueDrivers,
    Pois,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Geography => "geography",
            Stage::Scores => "scores",
            Stage::Demographics => "demographics",
            Stage::ValueDrivers => "value_drivers",
            Stage::Pois => "pois",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single stage for a single row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    NotAttempted,
    Succeeded,
    Failed(String),
}

impl StageStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageOutcomes {
    pub geography: StageStatus,
    pub scores: StageStatus,
    pub demographics: StageStatus,
    pub value_drivers: StageStatus,
    pub pois: StageStatus,
}

impl StageOutcomes {
    pub fn get(&self, stage: Stage) -> &StageStatus {
        match stage {
            Stage::Geography => &self.geography,
            Stage::Scores => &self.scores,
            Stage::Demographics => &self.demographics,
            Stage::ValueDrivers => &self.value_drivers,
            Stage::Pois => &self.pois,
        }
    }

    pub fn set(&mut self, stage: Stage, status: StageStatus) {
        let slot = match stage {
            Stage::Geography => &mut self.geography,
            Stage::Scores => &mut self.scores,
            Stage::Demographics => &mut self.demographics,
            Stage::ValueDrivers => &mut self.value_drivers,
            Stage::Pois => &mut self.pois,
        };
        *slot = status;
    }

    /// The first stage of the geography chain that failed, if any.
    pub fn chain_failure(&self) -> Option<Stage> {
        [Stage::Geography, Stage::Scores, Stage::Demographics, Stage::ValueDrivers]
            .into_iter()
            .find(|stage| self.get(*stage).is_failed())
    }
}

/// A `{name, value}` entry of a list-shaped value-drivers payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Value,
}

/// Value drivers arrive either as a list of named values or as an object of
/// categories, depending on the API version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValueDrivers {
    PairList(Vec<NamedValue>),
    CategorizedVariables(Map<String, Value>),
}

impl ValueDrivers {
    /// Detects the payload shape. Arrays must hold `{name, value}` objects;
    /// anything that is neither an array nor an object is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let mut pairs = Vec::with_capacity(items.len());
                for item in items {
                    let name = item["name"].as_str().ok_or_else(|| {
                        EnrichError::UnexpectedShape("value driver entry without a name".into())
                    })?;
                    pairs.push(NamedValue {
                        name: name.to_string(),
                        value: item.get("value").cloned().unwrap_or(Value::Null),
                    });
                }
                Ok(ValueDrivers::PairList(pairs))
            }
            Value::Object(categories) => Ok(ValueDrivers::CategorizedVariables(categories)),
            other => Err(EnrichError::UnexpectedShape(format!(
                "value drivers must be a list or an object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// POIs near a coordinate, plus the API's per-category totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoiLookup {
    pub pois: Vec<Value>,
    pub category_counts: Vec<(String, i64)>,
}

/// Accumulates everything fetched for one input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentRecord {
    pub index: usize,
    pub geo_id: Option<String>,
    pub scores: Option<Value>,
    pub demographics: Option<Value>,
    pub value_drivers: Option<ValueDrivers>,
    pub pois: Vec<Value>,
    pub poi_category_counts: Vec<(String, i64)>,
    pub poi_fetch_succeeded: bool,
    pub outcomes: StageOutcomes,
}

impl EnrichmentRecord {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            geo_id: None,
            scores: None,
            demographics: None,
            value_drivers: None,
            pois: Vec::new(),
            poi_category_counts: Vec::new(),
            poi_fetch_succeeded: false,
            outcomes: StageOutcomes::default(),
        }
    }
}
