use nalgebra::*;
use nalgebra_sparse::*;
use num_complex::Complex64;

use super::PowerFlowError;
use super::dsbus_dv::{bus_currents, dSbus_dV};
use super::solver::Solve;
use super::system::NodeInjection;

/// Positions of the unknowns of each node in the state vector
/// `[va(pv), va(pq), vm(pq)]`. Equation rows use the same layout,
/// active power rows first.
struct StateIndex {
    angle: Vec<Option<usize>>,
    magnitude: Vec<Option<usize>>,
    pvpq: Vec<usize>,
    npq: usize,
}

impl StateIndex {
    fn new(n: usize, pv: &[usize], pq: &[usize]) -> Self {
        let pvpq: Vec<usize> = pv.iter().chain(pq).copied().collect();
        let mut angle = vec![None; n];
        let mut magnitude = vec![None; n];
        for (pos, &node) in pvpq.iter().enumerate() {
            angle[node] = Some(pos);
        }
        for (pos, &node) in pq.iter().enumerate() {
            magnitude[node] = Some(pvpq.len() + pos);
        }
        StateIndex {
            angle,
            magnitude,
            pvpq,
            npq: pq.len(),
        }
    }

    fn len(&self) -> usize {
        self.pvpq.len() + self.npq
    }
}

/// Solves the power flow equations with the Newton-Raphson method.
///
/// `pv` and `pq` list the nodes whose state is unknown; every other node
/// keeps its value from `v_init`. Injections depend on the voltage magnitude
/// of their node, and their derivative enters the Jacobian diagonal.
///
/// Returns the converged voltages and the number of iterations used.
#[allow(clippy::too_many_arguments)]
pub fn newton_pf<Solver: Solve>(
    y_bus: &CsrMatrix<Complex64>,
    injections: &[NodeInjection],
    v_init: &DVector<Complex64>,
    pv: &[usize],
    pq: &[usize],
    tolerance: Option<f64>,
    max_iter: Option<usize>,
    solver: &mut Solver,
) -> Result<(DVector<Complex64>, usize), PowerFlowError> {
    let max_iter = max_iter.unwrap_or(10);
    let tol = tolerance.unwrap_or(1e-8);
    let index = StateIndex::new(v_init.len(), pv, pq);
    let num_state = index.len();

    let mut v = v_init.clone();
    if num_state == 0 {
        return Ok((v, 0));
    }
    let mut v_m = v.map(|e| e.norm());
    let mut v_a = v.map(|e| e.arg());

    let mut f = DVector::zeros(num_state);
    mismatch(&mut f, y_bus, injections, &v, &index);
    if f.amax() < tol {
        return Ok((v, 0));
    }

    for iterations in 1..=max_iter {
        let jacobian = build_jacobian(y_bus, injections, &v, &index);
        let (mut ap, mut ai, mut ax) = jacobian.disassemble();
        solver
            .solve(&mut ap, &mut ai, &mut ax, f.as_mut_slice(), num_state)
            .map_err(|e| PowerFlowError::Singular(e.to_owned()))?;

        update_v(&mut v, &mut v_m, &mut v_a, &f, &index);
        mismatch(&mut f, y_bus, injections, &v, &index);

        if f.iter().any(|x| !x.is_finite()) {
            return Err(PowerFlowError::NotConverged { iterations });
        }
        if f.amax() < tol {
            return Ok((v, iterations));
        }
    }
    Err(PowerFlowError::NotConverged {
        iterations: max_iter,
    })
}

/// Power mismatch `V conj(I) - S(|V|)` split into the equation rows.
#[inline(always)]
fn mismatch(
    f: &mut DVector<f64>,
    y_bus: &CsrMatrix<Complex64>,
    injections: &[NodeInjection],
    v: &DVector<Complex64>,
    index: &StateIndex,
) {
    let i_bus = bus_currents(y_bus, v);
    for &node in &index.pvpq {
        let mis = v[node] * i_bus[node].conj() - injections[node].at(v[node].norm());
        if let Some(row) = index.angle[node] {
            f[row] = mis.re;
        }
        if let Some(row) = index.magnitude[node] {
            f[row] = mis.im;
        }
    }
}

#[inline(always)]
fn update_v(
    v: &mut DVector<Complex64>,
    v_m: &mut DVector<f64>,
    v_a: &mut DVector<f64>,
    dx: &DVector<f64>,
    index: &StateIndex,
) {
    for &node in &index.pvpq {
        if let Some(pos) = index.angle[node] {
            v_a[node] -= dx[pos];
        }
        if let Some(pos) = index.magnitude[node] {
            v_m[node] -= dx[pos];
        }
        v[node] = Complex64::from_polar(v_m[node], v_a[node]);
    }
}

/// Assembles the real Jacobian of the mismatch rows over the state vector.
///
/// The pattern follows `y_bus` and does not depend on the voltages, so a
/// solver may reuse its symbolic factorization across iterations.
fn build_jacobian(
    y_bus: &CsrMatrix<Complex64>,
    injections: &[NodeInjection],
    v: &DVector<Complex64>,
    index: &StateIndex,
) -> CscMatrix<f64> {
    let (ds_dvm, ds_dva) = dSbus_dV(y_bus, v);
    let n = index.len();
    let mut coo = CooMatrix::new(n, n);
    let mut entry = 0;
    for (i, row) in y_bus.row_iter().enumerate() {
        let (p_row, q_row) = (index.angle[i], index.magnitude[i]);
        for &k in row.col_indices() {
            let d_va = ds_dva[entry];
            let mut d_vm = ds_dvm[entry];
            entry += 1;
            if i == k {
                d_vm -= injections[i].d_dvm(v[i].norm());
            }
            if let Some(r) = p_row {
                if let Some(c) = index.angle[k] {
                    coo.push(r, c, d_va.re);
                }
                if let Some(c) = index.magnitude[k] {
                    coo.push(r, c, d_vm.re);
                }
            }
            if let Some(r) = q_row {
                if let Some(c) = index.angle[k] {
                    coo.push(r, c, d_va.im);
                }
                if let Some(c) = index.magnitude[k] {
                    coo.push(r, c, d_vm.im);
                }
            }
        }
    }
    CscMatrix::from(&coo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::solver::DefaultSolver;

    fn two_node(z: Complex64) -> CsrMatrix<Complex64> {
        let y = Complex64::new(1.0, 0.0) / z;
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, y);
        coo.push(0, 1, -y);
        coo.push(1, 0, -y);
        coo.push(1, 1, y);
        CsrMatrix::from(&coo)
    }

    fn flat() -> DVector<Complex64> {
        DVector::from_element(2, Complex64::new(1.0, 0.0))
    }

    fn node_power(y_bus: &CsrMatrix<Complex64>, v: &DVector<Complex64>, node: usize) -> Complex64 {
        v[node] * bus_currents(y_bus, v)[node].conj()
    }

    #[test]
    fn converges_on_loaded_feeder() {
        let y_bus = two_node(Complex64::new(0.01, 0.05));
        let inj = [
            NodeInjection::default(),
            NodeInjection {
                s_const: Complex64::new(-0.5, -0.2),
                ..Default::default()
            },
        ];
        let (v, it) = newton_pf(
            &y_bus,
            &inj,
            &flat(),
            &[],
            &[1],
            None,
            None,
            &mut DefaultSolver::default(),
        )
        .unwrap();
        assert!(it >= 1 && it <= 10);
        assert!(v[1].norm() < 1.0);
        assert_eq!(v[0], Complex64::new(1.0, 0.0));
        assert!((node_power(&y_bus, &v, 1) - inj[1].s_const).norm() < 1e-8);
    }

    #[test]
    fn pv_node_holds_magnitude() {
        let y_bus = two_node(Complex64::new(0.02, 0.1));
        let inj = [
            NodeInjection::default(),
            NodeInjection {
                s_const: Complex64::new(0.3, 0.0),
                ..Default::default()
            },
        ];
        let mut v0 = flat();
        v0[1] = Complex64::new(1.02, 0.0);
        let (v, _) = newton_pf(
            &y_bus,
            &inj,
            &v0,
            &[1],
            &[],
            None,
            None,
            &mut DefaultSolver::default(),
        )
        .unwrap();
        assert!((v[1].norm() - 1.02).abs() < 1e-12);
        assert!(v[1].arg() > 0.0);
        assert!((node_power(&y_bus, &v, 1).re - 0.3).abs() < 1e-8);
    }

    #[test]
    fn impedance_load_scales_with_voltage() {
        let y_bus = two_node(Complex64::new(0.05, 0.1));
        let inj = [
            NodeInjection::default(),
            NodeInjection {
                s_impedance: Complex64::new(-0.8, -0.3),
                ..Default::default()
            },
        ];
        let (v, _) = newton_pf(
            &y_bus,
            &inj,
            &flat(),
            &[],
            &[1],
            None,
            None,
            &mut DefaultSolver::default(),
        )
        .unwrap();
        let vm = v[1].norm();
        let expected = Complex64::new(-0.8, -0.3) * vm * vm;
        assert!((node_power(&y_bus, &v, 1) - expected).norm() < 1e-8);
    }

    #[test]
    fn overload_does_not_converge() {
        let y_bus = two_node(Complex64::new(0.1, 0.5));
        let inj = [
            NodeInjection::default(),
            NodeInjection {
                s_const: Complex64::new(-50.0, -20.0),
                ..Default::default()
            },
        ];
        let err = newton_pf(
            &y_bus,
            &inj,
            &flat(),
            &[],
            &[1],
            None,
            None,
            &mut DefaultSolver::default(),
        )
        .unwrap_err();
        assert!(err.is_convergence());
    }

    #[test]
    fn slack_only_needs_no_iterations() {
        let y_bus = two_node(Complex64::new(0.1, 0.5));
        let (v, it) = newton_pf(
            &y_bus,
            &[NodeInjection::default(); 2],
            &flat(),
            &[],
            &[],
            None,
            None,
            &mut DefaultSolver::default(),
        )
        .unwrap();
        assert_eq!(it, 0);
        assert_eq!(v, flat());
    }
}
