use serde_json::{Map, Value};
use tracing::debug;

use super::attrs::{AttributeError, SetAttribute};
use super::resolve::{resolve_bus, resolve_switch_target};
use super::schema::{RESERVED, schema};
use super::{ElementHandle, ElementKind, GridModel};
use crate::error::AdapterError;
use crate::io::pandapower::*;

static NULL: Value = Value::Null;

/// Nominal voltage of a bus whose description omits `vn_kv`.
pub const DEFAULT_BUS_VN_KV: f64 = 20.0;

/// One element description with its parsed kind.
#[derive(Debug, Clone, Copy)]
pub struct Declared<'a> {
    pub id: &'a str,
    pub kind: ElementKind,
    pub props: &'a Map<String, Value>,
}

impl<'a> Declared<'a> {
    fn prop(&self, key: &str) -> &'a Value {
        self.props.get(key).unwrap_or(&NULL)
    }

    /// Properties consumed by the builder itself rather than the attribute table.
    fn is_structural(&self, key: &str) -> bool {
        schema(self.kind).is_bus_ref(key)
            || match self.kind {
                ElementKind::Line | ElementKind::Trafo => key == "std_type",
                ElementKind::Switch => key == "element" || key == "et",
                _ => false,
            }
    }
}

/// Parses the kind of an element description and checks its required properties.
pub fn declare<'a>(id: &'a str, value: &'a Value) -> Result<Declared<'a>, AdapterError> {
    let props = value
        .as_object()
        .ok_or_else(|| AdapterError::invalid(format!("Element \"{id}\" must be a JSON object.")))?;
    let tag = props.get("etype").ok_or_else(|| {
        AdapterError::invalid(format!("Could not get key \"etype\" from element \"{id}\"."))
    })?;
    let kind = tag.as_str().and_then(ElementKind::from_tag).ok_or_else(|| {
        let tag = tag.as_str().map(str::to_owned).unwrap_or_else(|| tag.to_string());
        AdapterError::invalid(format!(
            "Element type \"{tag}\" of element \"{id}\" is not a known element type."
        ))
    })?;
    for key in schema(kind).required {
        if !props.contains_key(*key) {
            return Err(AdapterError::invalid(format!(
                "Could not get key \"{key}\" from element \"{id}\"."
            )));
        }
    }
    Ok(Declared { id, kind, props })
}

/// Builds a grid model from the `elements` object of a simulation request.
///
/// Buses are created first so that every other element can reference them,
/// switches last since they may target lines and transformers.
pub fn build_model(elements: &Map<String, Value>) -> Result<GridModel, AdapterError> {
    let declared = elements
        .iter()
        .map(|(id, value)| declare(id, value))
        .collect::<Result<Vec<_>, _>>()?;

    let mut model = GridModel::new();
    let passes: [fn(ElementKind) -> bool; 3] = [
        |k| k == ElementKind::Bus,
        |k| k != ElementKind::Bus && k != ElementKind::Switch,
        |k| k == ElementKind::Switch,
    ];
    for pass in passes {
        for element in declared.iter().filter(|d| pass(d.kind)) {
            build_element(&mut model, element)?;
        }
    }

    debug!(
        buses = model.bus.len(),
        elements = model.handles.len(),
        switches = model.switch.len(),
        "grid model built"
    );
    Ok(model)
}

/// Creates one element in `model`.
pub fn build_element(
    model: &mut GridModel,
    element: &Declared<'_>,
) -> Result<ElementHandle, AdapterError> {
    let id = element.id;
    let handle = match element.kind {
        ElementKind::Bus => {
            let mut bus = Bus {
                vn_kv: DEFAULT_BUS_VN_KV,
                ..Default::default()
            };
            apply_properties(&mut bus, element)?;
            model.create_bus(id, bus)
        }
        ElementKind::Load => {
            let mut load = Load {
                bus: bus_ref(model, element, "bus")?,
                ..Default::default()
            };
            apply_properties(&mut load, element)?;
            model.create_load(id, load)
        }
        ElementKind::Gen => {
            let mut generator = Gen {
                bus: bus_ref(model, element, "bus")?,
                ..Default::default()
            };
            apply_properties(&mut generator, element)?;
            model.create_gen(id, generator)
        }
        ElementKind::ExtGrid => {
            let mut ext = ExtGrid {
                bus: bus_ref(model, element, "bus")?,
                ..Default::default()
            };
            apply_properties(&mut ext, element)?;
            model.create_ext_grid(id, ext)
        }
        ElementKind::Line => {
            let mut line = Line {
                from_bus: bus_ref(model, element, "from_bus")?,
                to_bus: bus_ref(model, element, "to_bus")?,
                ..Default::default()
            };
            let name = std_type_name(element)?;
            line_std_type(name)
                .ok_or_else(|| unknown_std_type(element, name))?
                .apply(&mut line);
            apply_properties(&mut line, element)?;
            model.create_line(id, line)
        }
        ElementKind::Trafo => {
            let mut trafo = Transformer {
                hv_bus: bus_ref(model, element, "hv_bus")?,
                lv_bus: bus_ref(model, element, "lv_bus")?,
                ..Default::default()
            };
            let name = std_type_name(element)?;
            trafo_std_type(name)
                .ok_or_else(|| unknown_std_type(element, name))?
                .apply(&mut trafo);
            apply_properties(&mut trafo, element)?;
            model.create_trafo(id, trafo)
        }
        ElementKind::Storage => {
            let mut storage = Storage {
                bus: bus_ref(model, element, "bus")?,
                ..Default::default()
            };
            apply_properties(&mut storage, element)?;
            model.create_storage(id, storage)
        }
        ElementKind::Switch => {
            let bus = bus_ref(model, element, "bus")?;
            let (et, target) =
                resolve_switch_target(model, id, element.prop("et"), element.prop("element"))?;
            let mut switch = Switch {
                bus,
                element: target,
                et,
                ..Default::default()
            };
            apply_properties(&mut switch, element)?;
            model.create_switch(id, switch)
        }
    };
    Ok(handle)
}

fn bus_ref(
    model: &GridModel,
    element: &Declared<'_>,
    property: &str,
) -> Result<usize, AdapterError> {
    resolve_bus(&model.bus_index, element.id, property, element.prop(property))
}

fn std_type_name<'a>(element: &Declared<'a>) -> Result<&'a str, AdapterError> {
    element.prop("std_type").as_str().ok_or_else(|| {
        AdapterError::invalid(format!(
            "Property \"std_type\" of element \"{}\" must be a string.",
            element.id
        ))
    })
}

fn unknown_std_type(element: &Declared<'_>, name: &str) -> AdapterError {
    AdapterError::invalid(format!(
        "Unknown standard type \"{name}\" for {} \"{}\".",
        element.kind, element.id
    ))
}

/// Writes every non-structural property through the attribute table.
fn apply_properties<T: SetAttribute>(
    target: &mut T,
    element: &Declared<'_>,
) -> Result<(), AdapterError> {
    for (key, value) in element.props {
        if key == "etype" || element.is_structural(key) {
            continue;
        }
        if RESERVED.contains(&key.as_str()) {
            return Err(AdapterError::invalid(format!(
                "Property \"{key}\" of element \"{}\" is reserved.",
                element.id
            )));
        }
        target
            .set_attribute(key, value)
            .map_err(|err| match err {
                AttributeError::Unknown => AdapterError::invalid(format!(
                    "Element \"{}\" of type \"{}\" has no property \"{key}\".",
                    element.id, element.kind
                )),
                AttributeError::WrongType(expected) => AdapterError::invalid(format!(
                    "Property \"{key}\" of element \"{}\" must be {expected}.",
                    element.id
                )),
            })?;
    }
    Ok(())
}
