//! Request-scoped grid model built from caller element descriptions.

pub mod attrs;
pub mod builder;
pub mod resolve;
pub mod schema;

use std::collections::HashMap;
use std::fmt;

use derive_more::{Deref, DerefMut};
use serde::Serialize;

use crate::io::pandapower::*;

pub use builder::build_model;

/// Kind of a grid element, given by the `etype` tag of its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Bus,
    Load,
    Gen,
    ExtGrid,
    Line,
    Trafo,
    Storage,
    Switch,
}

impl ElementKind {
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Bus,
        ElementKind::Load,
        ElementKind::Gen,
        ElementKind::ExtGrid,
        ElementKind::Line,
        ElementKind::Trafo,
        ElementKind::Storage,
        ElementKind::Switch,
    ];

    /// Parses an `etype` tag, accepting the long-form aliases.
    pub fn from_tag(tag: &str) -> Option<ElementKind> {
        match tag {
            "bus" => Some(ElementKind::Bus),
            "load" => Some(ElementKind::Load),
            "gen" | "generator" => Some(ElementKind::Gen),
            "ext_grid" | "external_grid" => Some(ElementKind::ExtGrid),
            "line" => Some(ElementKind::Line),
            "trafo" | "transformer" => Some(ElementKind::Trafo),
            "storage" => Some(ElementKind::Storage),
            "switch" => Some(ElementKind::Switch),
            _ => None,
        }
    }

    /// Canonical tag, also used as `etype` in results.
    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::Bus => "bus",
            ElementKind::Load => "load",
            ElementKind::Gen => "gen",
            ElementKind::ExtGrid => "ext_grid",
            ElementKind::Line => "line",
            ElementKind::Trafo => "trafo",
            ElementKind::Storage => "storage",
            ElementKind::Switch => "switch",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Position of a created element inside the per-kind table of its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub kind: ElementKind,
    pub index: usize,
}

/// Caller identifier to positional bus index.
#[derive(Debug, Default, Clone, Deref, DerefMut)]
pub struct BusIndexTable(pub HashMap<String, usize>);

/// All elements of one request, grouped by kind.
///
/// Each element's `name` is the caller identifier it was declared under;
/// results are matched back to callers through that name.
#[derive(Debug, Default, Clone)]
pub struct GridModel {
    pub bus: Vec<Bus>,
    pub load: Vec<Load>,
    pub gen_: Vec<Gen>,
    pub ext_grid: Vec<ExtGrid>,
    pub line: Vec<Line>,
    pub trafo: Vec<Transformer>,
    pub storage: Vec<Storage>,
    pub switch: Vec<Switch>,
    pub bus_index: BusIndexTable,
    /// Created elements in creation order.
    pub handles: Vec<(String, ElementHandle)>,
    /// System base power in MVA.
    pub sn_mva: f64,
    pub f_hz: f64,
}

impl GridModel {
    pub fn new() -> Self {
        Self {
            sn_mva: 1.0,
            f_hz: 50.0,
            ..Default::default()
        }
    }

    /// Appends a bus and records it in the bus index table.
    pub fn create_bus(&mut self, id: &str, mut bus: Bus) -> ElementHandle {
        bus.name = Some(id.to_owned());
        let index = self.bus.len();
        self.bus.push(bus);
        self.bus_index.insert(id.to_owned(), index);
        self.record(id, ElementKind::Bus, index)
    }

    pub fn create_load(&mut self, id: &str, mut load: Load) -> ElementHandle {
        load.name = Some(id.to_owned());
        self.load.push(load);
        self.record(id, ElementKind::Load, self.load.len() - 1)
    }

    pub fn create_gen(&mut self, id: &str, mut generator: Gen) -> ElementHandle {
        generator.name = Some(id.to_owned());
        self.gen_.push(generator);
        self.record(id, ElementKind::Gen, self.gen_.len() - 1)
    }

    pub fn create_ext_grid(&mut self, id: &str, mut ext: ExtGrid) -> ElementHandle {
        ext.name = Some(id.to_owned());
        self.ext_grid.push(ext);
        self.record(id, ElementKind::ExtGrid, self.ext_grid.len() - 1)
    }

    pub fn create_line(&mut self, id: &str, mut line: Line) -> ElementHandle {
        line.name = Some(id.to_owned());
        self.line.push(line);
        self.record(id, ElementKind::Line, self.line.len() - 1)
    }

    pub fn create_trafo(&mut self, id: &str, mut trafo: Transformer) -> ElementHandle {
        trafo.name = Some(id.to_owned());
        self.trafo.push(trafo);
        self.record(id, ElementKind::Trafo, self.trafo.len() - 1)
    }

    pub fn create_storage(&mut self, id: &str, mut storage: Storage) -> ElementHandle {
        storage.name = Some(id.to_owned());
        self.storage.push(storage);
        self.record(id, ElementKind::Storage, self.storage.len() - 1)
    }

    pub fn create_switch(&mut self, id: &str, mut switch: Switch) -> ElementHandle {
        switch.name = Some(id.to_owned());
        self.switch.push(switch);
        self.record(id, ElementKind::Switch, self.switch.len() - 1)
    }

    fn record(&mut self, id: &str, kind: ElementKind, index: usize) -> ElementHandle {
        let handle = ElementHandle { kind, index };
        self.handles.push((id.to_owned(), handle));
        handle
    }

    /// Index of the line whose name equals `name`.
    pub fn line_by_name(&self, name: &str) -> Option<usize> {
        self.line
            .iter()
            .position(|x| x.name.as_deref() == Some(name))
    }

    /// Index of the transformer whose name equals `name`.
    pub fn trafo_by_name(&self, name: &str) -> Option<usize> {
        self.trafo
            .iter()
            .position(|x| x.name.as_deref() == Some(name))
    }

    /// Number of elements of the given kind.
    pub fn count(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Bus => self.bus.len(),
            ElementKind::Load => self.load.len(),
            ElementKind::Gen => self.gen_.len(),
            ElementKind::ExtGrid => self.ext_grid.len(),
            ElementKind::Line => self.line.len(),
            ElementKind::Trafo => self.trafo.len(),
            ElementKind::Storage => self.storage.len(),
            ElementKind::Switch => self.switch.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_aliases() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ElementKind::from_tag("transformer"), Some(ElementKind::Trafo));
        assert_eq!(ElementKind::from_tag("generator"), Some(ElementKind::Gen));
        assert_eq!(ElementKind::from_tag("trafo3w"), None);
    }

    #[test]
    fn create_bus_records_index() {
        let mut net = GridModel::new();
        net.create_bus("a", Bus::default());
        let h = net.create_bus("b", Bus::default());
        assert_eq!(h.index, 1);
        assert_eq!(net.bus_index["b"], 1);
        assert_eq!(net.bus[1].name.as_deref(), Some("b"));
        assert_eq!(net.count(ElementKind::Bus), 2);
    }
}
