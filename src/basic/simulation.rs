use tracing::debug;

use super::PowerFlowError;
use super::model::GridModel;
use super::post_processing::{ResultTables, extract_results};
use super::solver::DefaultSolver;
use super::system::{PFNetwork, RunPF};
use crate::error::AdapterError;

/// Iteration limit of a single-phase solve.
pub const MAX_ITER: usize = 10;
/// Iteration limit of a three-phase solve.
pub const MAX_ITER_3PH: usize = 30;
/// Largest accepted power mismatch in per unit.
pub const TOLERANCE: f64 = 1e-8;

impl From<PowerFlowError> for AdapterError {
    fn from(err: PowerFlowError) -> Self {
        if err.is_convergence() {
            debug!(reason = %err, "load flow did not converge");
            AdapterError::Convergence("Load flow did not converge.".to_owned())
        } else {
            AdapterError::Solver(err.to_string())
        }
    }
}

/// Runs a load flow on `model` and returns its result tables.
///
/// Three-phase mode reports per-phase results of the symmetric solution and
/// does not support voltage controlled generators.
pub fn run_simulation(model: &GridModel, three_phase: bool) -> Result<ResultTables, AdapterError> {
    if three_phase && model.gen_.iter().any(|g| g.in_service) {
        return Err(PowerFlowError::Unsupported(
            "Generators are not supported in three-phase load flow.".to_owned(),
        )
        .into());
    }
    let net = PFNetwork::from_model(model)?;
    let max_it = if three_phase { MAX_ITER_3PH } else { MAX_ITER };
    let (v, iterations) = net.run_pf(&mut DefaultSolver::default(), Some(max_it), Some(TOLERANCE))?;
    debug!(iterations, three_phase, "load flow converged");
    Ok(extract_results(model, &net, &v, three_phase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::model::ElementKind;
    use crate::basic::system::tests::model_of;
    use serde_json::json;

    #[test]
    fn isolated_load_is_a_convergence_error() {
        let model = model_of(json!({
            "b": {"etype": "bus", "vn_kv": 0.4},
            "l": {"etype": "load", "bus": "b", "p_mw": 0.1},
        }));
        assert_eq!(
            run_simulation(&model, false).unwrap_err(),
            AdapterError::Convergence("Load flow did not converge.".into())
        );
    }

    #[test]
    fn generators_rejected_in_three_phase() {
        let model = model_of(json!({
            "b": {"etype": "bus", "vn_kv": 20.0},
            "x": {"etype": "ext_grid", "bus": "b"},
            "g": {"etype": "gen", "bus": "b", "p_mw": 1.0},
        }));
        assert!(matches!(run_simulation(&model, true), Err(AdapterError::Solver(_))));
        assert!(run_simulation(&model, false).is_ok());
    }

    #[test]
    fn model_errors_are_solver_errors() {
        let model = model_of(json!({
            "b": {"etype": "bus", "vn_kv": -1.0},
            "x": {"etype": "ext_grid", "bus": "b"},
        }));
        assert!(matches!(run_simulation(&model, false), Err(AdapterError::Solver(_))));
    }

    #[test]
    fn minimal_network_solves() {
        let model = model_of(json!({
            "b": {"etype": "bus", "vn_kv": 0.4},
            "x": {"etype": "ext_grid", "bus": "b", "vm_pu": 1.01},
            "l": {"etype": "load", "bus": "b", "p_mw": 0.1},
        }));
        let tables = run_simulation(&model, false).unwrap();
        let ext = tables.find(ElementKind::ExtGrid, "x").unwrap();
        assert!((ext.values[0] - 0.1).abs() < 1e-12);
        let bus = tables.find(ElementKind::Bus, "b").unwrap();
        assert!((bus.values[0] - 1.01).abs() < 1e-12);
    }
}
