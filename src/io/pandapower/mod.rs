pub mod elements;
pub mod std_types;
pub use elements::*;
pub use std_types::{line_std_type, trafo_std_type};
