pub(crate) mod dsbus_dv;
pub(crate) mod newtonpf;

pub mod model;
pub mod post_processing;
pub mod simulation;
pub mod solver;
pub mod system;

pub use newtonpf::newton_pf;

use thiserror::Error;

/// Failures of the load-flow layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PowerFlowError {
    #[error("power flow did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error("linear solve failed: {0}")]
    Singular(String),
    #[error("bus \"{0}\" carries an injection but is not connected to any slack")]
    UnsuppliedIsland(String),
    /// The model cannot be turned into a valid network.
    #[error("{0}")]
    Model(String),
    #[error("{0}")]
    Unsupported(String),
}

impl PowerFlowError {
    /// Whether the failure is a convergence problem rather than bad input.
    pub fn is_convergence(&self) -> bool {
        matches!(
            self,
            PowerFlowError::NotConverged { .. }
                | PowerFlowError::Singular(_)
                | PowerFlowError::UnsuppliedIsland(_)
        )
    }
}
