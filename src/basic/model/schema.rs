use super::ElementKind;

/// Construction properties of one element kind.
#[derive(Debug)]
pub struct PropertySchema {
    /// Properties that must be present in the element description.
    pub required: &'static [&'static str],
    /// Required properties holding a bus identifier.
    pub bus_refs: &'static [&'static str],
}

/// Properties that are never written as attributes.
pub const RESERVED: &[&str] = &["etype", "name"];

static BUS: PropertySchema = PropertySchema {
    required: &[],
    bus_refs: &[],
};
static LOAD: PropertySchema = PropertySchema {
    required: &["bus", "p_mw"],
    bus_refs: &["bus"],
};
static GEN: PropertySchema = PropertySchema {
    required: &["bus", "p_mw"],
    bus_refs: &["bus"],
};
static EXT_GRID: PropertySchema = PropertySchema {
    required: &["bus"],
    bus_refs: &["bus"],
};
static LINE: PropertySchema = PropertySchema {
    required: &["from_bus", "to_bus", "length_km", "std_type"],
    bus_refs: &["from_bus", "to_bus"],
};
static TRAFO: PropertySchema = PropertySchema {
    required: &["hv_bus", "lv_bus", "std_type"],
    bus_refs: &["hv_bus", "lv_bus"],
};
static STORAGE: PropertySchema = PropertySchema {
    required: &["bus", "p_mw", "max_e_mwh"],
    bus_refs: &["bus"],
};
// `element` is resolved by target kind, see `resolve::resolve_switch_target`.
static SWITCH: PropertySchema = PropertySchema {
    required: &["bus", "element", "et"],
    bus_refs: &["bus"],
};

/// Returns the construction schema of `kind`.
pub fn schema(kind: ElementKind) -> &'static PropertySchema {
    match kind {
        ElementKind::Bus => &BUS,
        ElementKind::Load => &LOAD,
        ElementKind::Gen => &GEN,
        ElementKind::ExtGrid => &EXT_GRID,
        ElementKind::Line => &LINE,
        ElementKind::Trafo => &TRAFO,
        ElementKind::Storage => &STORAGE,
        ElementKind::Switch => &SWITCH,
    }
}

impl PropertySchema {
    pub fn is_required(&self, property: &str) -> bool {
        self.required.contains(&property)
    }

    pub fn is_bus_ref(&self, property: &str) -> bool {
        self.bus_refs.contains(&property)
    }
}
