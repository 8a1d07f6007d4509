//! Built-in standard types for lines and transformers.
//!
//! The parameter sets are the pandapower basic standard types; a line or
//! transformer created with `std_type` copies these values and the caller
//! may override any of them afterwards through optional properties.

use super::elements::{Line, Transformer};

/// Electrical parameters of a line standard type.
#[derive(Debug, Clone, Copy)]
pub struct LineStdType {
    pub name: &'static str,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub max_i_ka: f64,
    /// `cs` for cables, `ol` for overhead lines.
    pub type_: &'static str,
}

/// Electrical parameters of a two-winding transformer standard type.
#[derive(Debug, Clone, Copy)]
pub struct TrafoStdType {
    pub name: &'static str,
    pub sn_mva: f64,
    pub vn_hv_kv: f64,
    pub vn_lv_kv: f64,
    pub vk_percent: f64,
    pub vkr_percent: f64,
    pub pfe_kw: f64,
    pub i0_percent: f64,
    pub shift_degree: f64,
    pub tap_min: f64,
    pub tap_max: f64,
    pub tap_step_percent: f64,
    pub vector_group: &'static str,
}

macro_rules! line_types {
    ($($name:literal => ($r:expr, $x:expr, $c:expr, $i:expr, $t:literal)),* $(,)?) => {
        &[$(LineStdType {
            name: $name,
            r_ohm_per_km: $r,
            x_ohm_per_km: $x,
            c_nf_per_km: $c,
            max_i_ka: $i,
            type_: $t,
        }),*]
    };
}

pub static LINE_STD_TYPES: &[LineStdType] = line_types! {
    "NAYY 4x50 SE" => (0.642, 0.083, 210.0, 0.142, "cs"),
    "NAYY 4x120 SE" => (0.225, 0.080, 264.0, 0.242, "cs"),
    "NAYY 4x150 SE" => (0.208, 0.080, 261.0, 0.270, "cs"),
    "NA2XS2Y 1x95 RM/25 12/20 kV" => (0.313, 0.132, 216.0, 0.252, "cs"),
    "NA2XS2Y 1x185 RM/25 12/20 kV" => (0.161, 0.117, 273.0, 0.362, "cs"),
    "NA2XS2Y 1x240 RM/25 12/20 kV" => (0.122, 0.112, 304.0, 0.421, "cs"),
    "N2XS(FL)2Y 1x120 RM/35 64/110 kV" => (0.153, 0.166, 112.0, 0.366, "cs"),
    "N2XS(FL)2Y 1x185 RM/35 64/110 kV" => (0.099, 0.156, 125.0, 0.457, "cs"),
    "48-AL1/8-ST1A 10.0" => (0.5939, 0.35, 10.1, 0.210, "ol"),
    "94-AL1/15-ST1A 10.0" => (0.306, 0.33, 10.75, 0.350, "ol"),
    "48-AL1/8-ST1A 20.0" => (0.5939, 0.372, 9.5, 0.210, "ol"),
    "94-AL1/15-ST1A 20.0" => (0.306, 0.35, 10.0, 0.350, "ol"),
    "149-AL1/24-ST1A 110.0" => (0.194, 0.41, 8.75, 0.470, "ol"),
    "243-AL1/39-ST1A 110.0" => (0.1188, 0.39, 9.0, 0.645, "ol"),
};

pub static TRAFO_STD_TYPES: &[TrafoStdType] = &[
    TrafoStdType {
        name: "0.25 MVA 20/0.4 kV",
        sn_mva: 0.25,
        vn_hv_kv: 20.0,
        vn_lv_kv: 0.4,
        vk_percent: 6.0,
        vkr_percent: 1.44,
        pfe_kw: 0.8,
        i0_percent: 0.32,
        shift_degree: 150.0,
        tap_min: -2.0,
        tap_max: 2.0,
        tap_step_percent: 2.5,
        vector_group: "Yzn5",
    },
    TrafoStdType {
        name: "0.4 MVA 20/0.4 kV",
        sn_mva: 0.4,
        vn_hv_kv: 20.0,
        vn_lv_kv: 0.4,
        vk_percent: 6.0,
        vkr_percent: 1.425,
        pfe_kw: 1.35,
        i0_percent: 0.3375,
        shift_degree: 150.0,
        tap_min: -2.0,
        tap_max: 2.0,
        tap_step_percent: 2.5,
        vector_group: "Dyn5",
    },
    TrafoStdType {
        name: "0.63 MVA 20/0.4 kV",
        sn_mva: 0.63,
        vn_hv_kv: 20.0,
        vn_lv_kv: 0.4,
        vk_percent: 6.0,
        vkr_percent: 1.206,
        pfe_kw: 1.65,
        i0_percent: 0.2619,
        shift_degree: 150.0,
        tap_min: -2.0,
        tap_max: 2.0,
        tap_step_percent: 2.5,
        vector_group: "Dyn5",
    },
    TrafoStdType {
        name: "25 MVA 110/20 kV",
        sn_mva: 25.0,
        vn_hv_kv: 110.0,
        vn_lv_kv: 20.0,
        vk_percent: 12.0,
        vkr_percent: 0.41,
        pfe_kw: 14.0,
        i0_percent: 0.07,
        shift_degree: 150.0,
        tap_min: -9.0,
        tap_max: 9.0,
        tap_step_percent: 1.5,
        vector_group: "YNd5",
    },
    TrafoStdType {
        name: "40 MVA 110/20 kV",
        sn_mva: 40.0,
        vn_hv_kv: 110.0,
        vn_lv_kv: 20.0,
        vk_percent: 16.2,
        vkr_percent: 0.34,
        pfe_kw: 18.0,
        i0_percent: 0.05,
        shift_degree: 150.0,
        tap_min: -9.0,
        tap_max: 9.0,
        tap_step_percent: 1.5,
        vector_group: "YNd5",
    },
    TrafoStdType {
        name: "63 MVA 110/20 kV",
        sn_mva: 63.0,
        vn_hv_kv: 110.0,
        vn_lv_kv: 20.0,
        vk_percent: 18.0,
        vkr_percent: 0.32,
        pfe_kw: 22.0,
        i0_percent: 0.04,
        shift_degree: 150.0,
        tap_min: -9.0,
        tap_max: 9.0,
        tap_step_percent: 1.5,
        vector_group: "YNd5",
    },
];

pub fn line_std_type(name: &str) -> Option<&'static LineStdType> {
    LINE_STD_TYPES.iter().find(|t| t.name == name)
}

pub fn trafo_std_type(name: &str) -> Option<&'static TrafoStdType> {
    TRAFO_STD_TYPES.iter().find(|t| t.name == name)
}

impl LineStdType {
    /// Copies the type parameters onto a line.
    pub fn apply(&self, line: &mut Line) {
        line.std_type = Some(self.name.to_owned());
        line.r_ohm_per_km = self.r_ohm_per_km;
        line.x_ohm_per_km = self.x_ohm_per_km;
        line.c_nf_per_km = self.c_nf_per_km;
        line.g_us_per_km = 0.0;
        line.max_i_ka = self.max_i_ka;
        line.type_ = Some(self.type_.to_owned());
    }
}

impl TrafoStdType {
    /// Copies the type parameters onto a transformer; the tap starts at neutral.
    pub fn apply(&self, trafo: &mut Transformer) {
        trafo.std_type = Some(self.name.to_owned());
        trafo.sn_mva = self.sn_mva;
        trafo.vn_hv_kv = self.vn_hv_kv;
        trafo.vn_lv_kv = self.vn_lv_kv;
        trafo.vk_percent = self.vk_percent;
        trafo.vkr_percent = self.vkr_percent;
        trafo.pfe_kw = self.pfe_kw;
        trafo.i0_percent = self.i0_percent;
        trafo.shift_degree = self.shift_degree;
        trafo.tap_side = Some("hv".to_owned());
        trafo.tap_neutral = Some(0.0);
        trafo.tap_min = Some(self.tap_min);
        trafo.tap_max = Some(self.tap_max);
        trafo.tap_step_percent = Some(self.tap_step_percent);
        trafo.tap_step_degree = Some(0.0);
        trafo.tap_pos = Some(0.0);
        trafo.tap_phase_shifter = false;
        trafo.vector_group = Some(self.vector_group.to_owned());
    }
}
