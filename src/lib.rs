pub mod api;
pub mod basic;
pub mod config;
pub mod error;
pub mod io;
pub mod telemetry;

pub mod prelude {
    use crate::basic;
    pub use crate::error::AdapterError;
    pub use crate::io::pandapower;
    pub use crate::io::request::{Reply, handle_request};
    pub use basic::*;

    pub use basic::model::{ElementKind, GridModel, build_model};
    pub use basic::simulation::run_simulation;
}
