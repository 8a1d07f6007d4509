use serde_json::Value;

use super::{BusIndexTable, GridModel};
use crate::error::AdapterError;
use crate::io::pandapower::SwitchType;

/// Resolves a bus reference property to its positional bus index.
///
/// Only properties declared as bus references in the schema go through
/// here; other values are never compared against bus identifiers.
pub fn resolve_bus(
    buses: &BusIndexTable,
    element: &str,
    property: &str,
    value: &Value,
) -> Result<usize, AdapterError> {
    let Some(id) = value.as_str() else {
        return Err(AdapterError::invalid(format!(
            "Property \"{property}\" of element \"{element}\" must be a bus identifier."
        )));
    };
    buses.get(id).copied().ok_or_else(|| {
        AdapterError::invalid(format!(
            "Element \"{element}\" references unknown bus \"{id}\" in \"{property}\"."
        ))
    })
}

/// Resolves the `et` and `element` properties of a switch.
///
/// Bus targets resolve through the bus index table, line and transformer
/// targets by name against the elements already in `model`.
pub fn resolve_switch_target(
    model: &GridModel,
    switch: &str,
    et: &Value,
    element: &Value,
) -> Result<(SwitchType, usize), AdapterError> {
    let letter = et.as_str().unwrap_or_default();
    let et = SwitchType::from_letter(letter).ok_or_else(|| {
        AdapterError::invalid(format!(
            "Switch \"{switch}\" has invalid element type \"{}\"; expected one of b, l, t, t3.",
            display(et)
        ))
    })?;

    let index = match et {
        SwitchType::SwitchTwoBuses => resolve_bus(&model.bus_index, switch, "element", element)?,
        SwitchType::SwitchBusLine => {
            let id = target_id(switch, element)?;
            model.line_by_name(id).ok_or_else(|| not_found(switch, "line", id))?
        }
        SwitchType::SwitchBusTransformer => {
            let id = target_id(switch, element)?;
            model.trafo_by_name(id).ok_or_else(|| not_found(switch, "transformer", id))?
        }
        // Three-winding transformers are not a buildable kind, so no target exists.
        SwitchType::SwitchBusTransformer3w => {
            let id = target_id(switch, element)?;
            return Err(not_found(switch, "three-winding transformer", id));
        }
    };
    Ok((et, index))
}

fn target_id<'a>(switch: &str, element: &'a Value) -> Result<&'a str, AdapterError> {
    element.as_str().ok_or_else(|| {
        AdapterError::invalid(format!(
            "Property \"element\" of switch \"{switch}\" must be an element identifier."
        ))
    })
}

fn not_found(switch: &str, what: &str, id: &str) -> AdapterError {
    AdapterError::invalid(format!(
        "Switch \"{switch}\" references unknown {what} \"{id}\"."
    ))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}
