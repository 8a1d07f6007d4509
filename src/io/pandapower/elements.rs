//! Element tables of a grid model.
//!
//! Field names follow the pandapower element tables so that callers can
//! address attributes by the names they already know. Bus references are
//! stored as positional indices into the bus table of the owning model.

use serde::{Deserialize, Serialize};

/// Represents a bus in the network.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bus {
    pub name: Option<String>,
    pub vn_kv: f64,
    #[serde(rename = "type")]
    pub type_: Option<String>, // Added underscore to avoid conflict with Rust keyword
    pub zone: Option<String>,
    pub in_service: bool,
    pub max_vm_pu: Option<f64>,
    pub min_vm_pu: Option<f64>,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            name: None,
            vn_kv: 0.0,
            type_: Some("b".to_owned()),
            zone: None,
            in_service: true,
            max_vm_pu: None,
            min_vm_pu: None,
        }
    }
}

/// Represents a load in the network.
///
/// `const_z_percent` and `const_i_percent` split the demand into constant
/// impedance and constant current shares; the rest is constant power.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Load {
    pub name: Option<String>,
    pub bus: usize,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub const_z_percent: f64,
    pub const_i_percent: f64,
    pub sn_mva: Option<f64>,
    pub scaling: f64,
    pub in_service: bool,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub controllable: Option<bool>,
}

impl Default for Load {
    fn default() -> Self {
        Self {
            name: None,
            bus: 0,
            p_mw: 0.0,
            q_mvar: 0.0,
            const_z_percent: 0.0,
            const_i_percent: 0.0,
            sn_mva: None,
            scaling: 1.0,
            in_service: true,
            type_: Some("wye".to_owned()),
            controllable: None,
        }
    }
}

/// Represents a voltage controlled generator in the network.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Gen {
    pub name: Option<String>,
    pub bus: usize,
    pub p_mw: f64,
    pub vm_pu: f64,
    pub sn_mva: Option<f64>,
    pub scaling: f64,
    pub slack: bool,
    pub slack_weight: f64,
    pub in_service: bool,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub controllable: Option<bool>,
    pub max_p_mw: Option<f64>,
    pub min_p_mw: Option<f64>,
    pub max_q_mvar: Option<f64>,
    pub min_q_mvar: Option<f64>,
}

impl Default for Gen {
    fn default() -> Self {
        Self {
            name: None,
            bus: 0,
            p_mw: 0.0,
            vm_pu: 1.0,
            sn_mva: None,
            scaling: 1.0,
            slack: false,
            slack_weight: 0.0,
            in_service: true,
            type_: None,
            controllable: None,
            max_p_mw: None,
            min_p_mw: None,
            max_q_mvar: None,
            min_q_mvar: None,
        }
    }
}

/// Represents an external grid in the network.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtGrid {
    pub name: Option<String>,
    pub bus: usize,
    pub vm_pu: f64,
    pub va_degree: f64,
    pub slack_weight: f64,
    pub in_service: bool,
    pub s_sc_max_mva: Option<f64>,
    pub s_sc_min_mva: Option<f64>,
    pub rx_max: Option<f64>,
    pub rx_min: Option<f64>,
    pub r0x0_max: Option<f64>,
    pub x0x_max: Option<f64>,
    pub max_p_mw: Option<f64>,
    pub min_p_mw: Option<f64>,
    pub max_q_mvar: Option<f64>,
    pub min_q_mvar: Option<f64>,
}

impl Default for ExtGrid {
    fn default() -> Self {
        Self {
            name: None,
            bus: 0,
            vm_pu: 1.0,
            va_degree: 0.0,
            slack_weight: 1.0,
            in_service: true,
            s_sc_max_mva: None,
            s_sc_min_mva: None,
            rx_max: None,
            rx_min: None,
            r0x0_max: None,
            x0x_max: None,
            max_p_mw: None,
            min_p_mw: None,
            max_q_mvar: None,
            min_q_mvar: None,
        }
    }
}

/// Represents a line in the network.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Line {
    pub name: Option<String>,
    pub std_type: Option<String>,
    pub from_bus: usize,
    pub to_bus: usize,
    pub length_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub g_us_per_km: f64,
    pub max_i_ka: f64,
    pub df: f64,
    pub parallel: u32,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub in_service: bool,
    pub max_loading_percent: Option<f64>,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            name: None,
            std_type: None,
            from_bus: 0,
            to_bus: 0,
            length_km: 0.0,
            r_ohm_per_km: 0.0,
            x_ohm_per_km: 0.0,
            c_nf_per_km: 0.0,
            g_us_per_km: 0.0,
            max_i_ka: 0.0,
            df: 1.0,
            parallel: 1,
            type_: None,
            in_service: true,
            max_loading_percent: None,
        }
    }
}

/// Represents a two-winding transformer in the network.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Transformer {
    pub name: Option<String>,
    pub std_type: Option<String>,
    pub hv_bus: usize,
    pub lv_bus: usize,
    pub sn_mva: f64,
    pub vn_hv_kv: f64,
    pub vn_lv_kv: f64,
    pub vk_percent: f64,
    pub vkr_percent: f64,
    pub pfe_kw: f64,
    pub i0_percent: f64,
    pub shift_degree: f64,
    pub tap_side: Option<String>,
    pub tap_neutral: Option<f64>,
    pub tap_min: Option<f64>,
    pub tap_max: Option<f64>,
    pub tap_step_percent: Option<f64>,
    pub tap_step_degree: Option<f64>,
    pub tap_pos: Option<f64>,
    pub tap_phase_shifter: bool,
    pub vector_group: Option<String>,
    pub parallel: u32,
    pub df: f64,
    pub in_service: bool,
    pub max_loading_percent: Option<f64>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self {
            name: None,
            std_type: None,
            hv_bus: 0,
            lv_bus: 0,
            sn_mva: 0.0,
            vn_hv_kv: 0.0,
            vn_lv_kv: 0.0,
            vk_percent: 0.0,
            vkr_percent: 0.0,
            pfe_kw: 0.0,
            i0_percent: 0.0,
            shift_degree: 0.0,
            tap_side: None,
            tap_neutral: None,
            tap_min: None,
            tap_max: None,
            tap_step_percent: None,
            tap_step_degree: None,
            tap_pos: None,
            tap_phase_shifter: false,
            vector_group: None,
            parallel: 1,
            df: 1.0,
            in_service: true,
            max_loading_percent: None,
        }
    }
}

/// Represents a storage unit. Positive `p_mw` means charging (consumption).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Storage {
    pub name: Option<String>,
    pub bus: usize,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub max_e_mwh: f64,
    pub min_e_mwh: f64,
    pub soc_percent: Option<f64>,
    pub sn_mva: Option<f64>,
    pub scaling: f64,
    pub in_service: bool,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub controllable: Option<bool>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            name: None,
            bus: 0,
            p_mw: 0.0,
            q_mvar: 0.0,
            max_e_mwh: 0.0,
            min_e_mwh: 0.0,
            soc_percent: None,
            sn_mva: None,
            scaling: 1.0,
            in_service: true,
            type_: None,
            controllable: None,
        }
    }
}

/// Kind of element a switch is attached to, given by its `et` letter.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
pub enum SwitchType {
    #[serde(rename = "l")]
    SwitchBusLine,
    #[serde(rename = "t")]
    SwitchBusTransformer,
    #[serde(rename = "t3")]
    SwitchBusTransformer3w,
    #[serde(rename = "b")]
    #[default]
    SwitchTwoBuses,
}

impl SwitchType {
    /// Parses an `et` letter. Unknown letters yield `None`.
    pub fn from_letter(s: &str) -> Option<SwitchType> {
        match s {
            "l" => Some(SwitchType::SwitchBusLine),
            "t" => Some(SwitchType::SwitchBusTransformer),
            "t3" => Some(SwitchType::SwitchBusTransformer3w),
            "b" => Some(SwitchType::SwitchTwoBuses),
            _ => None,
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            SwitchType::SwitchBusLine => "l",
            SwitchType::SwitchBusTransformer => "t",
            SwitchType::SwitchBusTransformer3w => "t3",
            SwitchType::SwitchTwoBuses => "b",
        }
    }
}

/// Represents a switch in the network.
///
/// `element` is an index into the bus, line or transformer table depending
/// on `et`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Switch {
    pub name: Option<String>,
    pub bus: usize,
    pub element: usize,
    pub et: SwitchType,
    pub closed: bool,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub z_ohm: f64,
    pub in_ka: Option<f64>,
}

impl Default for Switch {
    fn default() -> Self {
        Self {
            name: None,
            bus: 0,
            element: 0,
            et: SwitchType::default(),
            closed: true,
            type_: None,
            z_ohm: 0.0,
            in_ka: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_letters_round_trip() {
        for et in ["b", "l", "t", "t3"] {
            assert_eq!(SwitchType::from_letter(et).unwrap().letter(), et);
        }
        assert_eq!(SwitchType::from_letter("x"), None);
    }

    #[test]
    fn defaults_follow_create_functions() {
        let load = Load::default();
        assert_eq!(load.scaling, 1.0);
        assert!(load.in_service);
        assert_eq!(ExtGrid::default().vm_pu, 1.0);
        assert!(Switch::default().closed);
        assert_eq!(Line::default().parallel, 1);
    }
}
