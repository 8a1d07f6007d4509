//! Maps result tables back onto the identifiers the caller declared.

use serde_json::{Map, Value};

use crate::basic::model::{ElementKind, GridModel};
use crate::basic::post_processing::ResultTables;

fn number(x: f64) -> Value {
    if x.is_finite() { Value::from(x) } else { Value::from(0.0) }
}

/// Builds the `elements` object of a simulation result.
///
/// Every declared element except switches gets an entry carrying its
/// `etype` and the columns of its result table. Values that are missing or
/// not finite are reported as zero.
pub fn project(model: &GridModel, results: &ResultTables) -> Map<String, Value> {
    let mut elements = Map::new();
    for (id, handle) in &model.handles {
        if handle.kind == ElementKind::Switch {
            continue;
        }
        let mut entry = Map::new();
        entry.insert("etype".to_owned(), Value::from(handle.kind.tag()));
        if let Some(table) = results.table(handle.kind) {
            let row = table.find(id);
            for (col, column) in table.columns.iter().enumerate() {
                let value = row
                    .and_then(|r| r.values.get(col).copied())
                    .unwrap_or(f64::NAN);
                entry.insert((*column).to_owned(), number(value));
            }
        }
        elements.insert(id.clone(), Value::Object(entry));
    }
    elements
}
