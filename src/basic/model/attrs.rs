//! Per-kind attribute tables.
//!
//! Each element struct exposes the attributes a caller may write by name.
//! The tables are generated by `attribute_table!` so that the JSON name, the
//! field and the accepted JSON type stay next to each other.

use serde_json::Value;
use thiserror::Error;

use crate::io::pandapower::*;

#[derive(Debug, Error, PartialEq)]
pub enum AttributeError {
    #[error("unknown attribute")]
    Unknown,
    #[error("expected {0}")]
    WrongType(&'static str),
}

/// Conversion of a JSON value into an attribute value.
pub trait FromJson: Sized {
    const EXPECTED: &'static str;
    fn from_json(value: &Value) -> Option<Self>;
}

impl FromJson for f64 {
    const EXPECTED: &'static str = "a number";
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromJson for bool {
    const EXPECTED: &'static str = "a boolean";
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromJson for u32 {
    const EXPECTED: &'static str = "a non-negative integer";
    fn from_json(value: &Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return u32::try_from(n).ok();
        }
        // Integral floats such as `2.0` are accepted.
        value
            .as_f64()
            .filter(|x| x.fract() == 0.0 && *x >= 0.0 && *x <= u32::MAX as f64)
            .map(|x| x as u32)
    }
}

/// Strings also accept numbers, which are kept in their JSON spelling.
impl FromJson for String {
    const EXPECTED: &'static str = "a string";
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl<T: FromJson> FromJson for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            v => T::from_json(v).map(Some),
        }
    }
}

fn convert<T: FromJson>(value: &Value) -> Result<T, AttributeError> {
    T::from_json(value).ok_or(AttributeError::WrongType(T::EXPECTED))
}

/// Writes a named attribute of an element.
pub trait SetAttribute {
    fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), AttributeError>;

    /// Names accepted by `set_attribute`.
    fn attribute_names() -> &'static [&'static str];
}

macro_rules! attribute_table {
    ($ty:ty { $($key:literal => $field:ident),* $(,)? }) => {
        impl SetAttribute for $ty {
            fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), AttributeError> {
                match name {
                    $( $key => { self.$field = convert(value)?; Ok(()) } )*
                    _ => Err(AttributeError::Unknown),
                }
            }

            fn attribute_names() -> &'static [&'static str] {
                &[$($key),*]
            }
        }
    };
}

attribute_table!(Bus {
    "vn_kv" => vn_kv,
    "type" => type_,
    "zone" => zone,
    "in_service" => in_service,
    "max_vm_pu" => max_vm_pu,
    "min_vm_pu" => min_vm_pu,
});

attribute_table!(Load {
    "p_mw" => p_mw,
    "q_mvar" => q_mvar,
    "const_z_percent" => const_z_percent,
    "const_i_percent" => const_i_percent,
    "sn_mva" => sn_mva,
    "scaling" => scaling,
    "in_service" => in_service,
    "type" => type_,
    "controllable" => controllable,
});

attribute_table!(Gen {
    "p_mw" => p_mw,
    "vm_pu" => vm_pu,
    "sn_mva" => sn_mva,
    "scaling" => scaling,
    "slack" => slack,
    "slack_weight" => slack_weight,
    "in_service" => in_service,
    "type" => type_,
    "controllable" => controllable,
    "max_p_mw" => max_p_mw,
    "min_p_mw" => min_p_mw,
    "max_q_mvar" => max_q_mvar,
    "min_q_mvar" => min_q_mvar,
});

attribute_table!(ExtGrid {
    "vm_pu" => vm_pu,
    "va_degree" => va_degree,
    "slack_weight" => slack_weight,
    "in_service" => in_service,
    "s_sc_max_mva" => s_sc_max_mva,
    "s_sc_min_mva" => s_sc_min_mva,
    "rx_max" => rx_max,
    "rx_min" => rx_min,
    "r0x0_max" => r0x0_max,
    "x0x_max" => x0x_max,
    "max_p_mw" => max_p_mw,
    "min_p_mw" => min_p_mw,
    "max_q_mvar" => max_q_mvar,
    "min_q_mvar" => min_q_mvar,
});

attribute_table!(Line {
    "length_km" => length_km,
    "r_ohm_per_km" => r_ohm_per_km,
    "x_ohm_per_km" => x_ohm_per_km,
    "c_nf_per_km" => c_nf_per_km,
    "g_us_per_km" => g_us_per_km,
    "max_i_ka" => max_i_ka,
    "df" => df,
    "parallel" => parallel,
    "type" => type_,
    "in_service" => in_service,
    "max_loading_percent" => max_loading_percent,
});

attribute_table!(Transformer {
    "sn_mva" => sn_mva,
    "vn_hv_kv" => vn_hv_kv,
    "vn_lv_kv" => vn_lv_kv,
    "vk_percent" => vk_percent,
    "vkr_percent" => vkr_percent,
    "pfe_kw" => pfe_kw,
    "i0_percent" => i0_percent,
    "shift_degree" => shift_degree,
    "tap_side" => tap_side,
    "tap_neutral" => tap_neutral,
    "tap_min" => tap_min,
    "tap_max" => tap_max,
    "tap_step_percent" => tap_step_percent,
    "tap_step_degree" => tap_step_degree,
    "tap_pos" => tap_pos,
    "tap_phase_shifter" => tap_phase_shifter,
    "vector_group" => vector_group,
    "parallel" => parallel,
    "df" => df,
    "in_service" => in_service,
    "max_loading_percent" => max_loading_percent,
});

attribute_table!(Storage {
    "p_mw" => p_mw,
    "q_mvar" => q_mvar,
    "max_e_mwh" => max_e_mwh,
    "min_e_mwh" => min_e_mwh,
    "soc_percent" => soc_percent,
    "sn_mva" => sn_mva,
    "scaling" => scaling,
    "in_service" => in_service,
    "type" => type_,
    "controllable" => controllable,
});

attribute_table!(Switch {
    "closed" => closed,
    "type" => type_,
    "z_ohm" => z_ohm,
    "in_ka" => in_ka,
});
