use crate::common::constants::VALUE_DRIVERS_PREFIX;
use crate::domain::ValueDrivers;
use serde_json::{Map, Value};

/// A flattened payload: dotted leaf paths with their values, in payload order.
pub type Leaves = Vec<(String, Value)>;

/// Flatten a nested JSON value into `prefix.a.b = leaf` pairs.
///
/// Objects are descended into; arrays, scalars and nested nulls are leaves.
/// An empty object or a null payload contributes nothing, so neither `{}`
/// nor `null` yields columns.
pub fn flatten_value(prefix: &str, value: &Value) -> Leaves {
    let mut leaves = Vec::new();
    if !value.is_null() {
        push_leaves(prefix, value, &mut leaves);
    }
    leaves
}

fn push_leaves(path: &str, value: &Value, leaves: &mut Leaves) {
    match value {
        Value::Object(map) => push_object(path, map, leaves),
        leaf => leaves.push((path.to_string(), leaf.clone())),
    }
}

fn push_object(path: &str, map: &Map<String, Value>, leaves: &mut Leaves) {
    for (key, child) in map {
        push_leaves(&join(path, key), child, leaves);
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Flatten value drivers according to their shape.
///
/// `PairList` gives `value_drivers.<name>`. `CategorizedVariables` gives
/// `value_drivers.<category>.<variable>` for each entry of a category's
/// `variables` list; its remaining keys are flattened generically.
///
/// A variable named like a sibling key of its category (`score` next to
/// `{"variable": "score"}`) yields the same path twice; the normalizer keeps
/// the later one.
pub fn flatten_value_drivers(drivers: &ValueDrivers) -> Leaves {
    let mut leaves = Vec::new();
    match drivers {
        ValueDrivers::PairList(pairs) => {
            for pair in pairs {
                leaves.push((join(VALUE_DRIVERS_PREFIX, &pair.name), pair.value.clone()));
            }
        }
        ValueDrivers::CategorizedVariables(categories) => {
            for (category, body) in categories {
                let category_path = join(VALUE_DRIVERS_PREFIX, category);
                match body {
                    Value::Object(fields) => push_category(&category_path, fields, &mut leaves),
                    leaf => leaves.push((category_path, leaf.clone())),
                }
            }
        }
    }
    leaves
}

fn push_category(path: &str, fields: &Map<String, Value>, leaves: &mut Leaves) {
    for (key, child) in fields {
        match (key.as_str(), child) {
            ("variables", Value::Array(variables)) => {
                for variable in variables {
                    match variable_name(variable) {
                        Some(name) => leaves.push((
                            join(path, name),
                            variable.get("value").cloned().unwrap_or(Value::Null),
                        )),
                        // unnamed entries keep their position under the list path
                        None => push_leaves(&join(path, key), variable, leaves),
                    }
                }
            }
            _ => push_leaves(&join(path, key), child, leaves),
        }
    }
}

fn variable_name(variable: &Value) -> Option<&str> {
    variable["variable"]
        .as_str()
        .or_else(|| variable["name"].as_str())
}
