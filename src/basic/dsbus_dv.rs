use nalgebra::*;
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex64;

/// Injected node currents `I = Ybus * V`.
pub(crate) fn bus_currents(
    y_bus: &CsrMatrix<Complex64>,
    v: &DVector<Complex64>,
) -> DVector<Complex64> {
    DVector::from_iterator(
        y_bus.nrows(),
        y_bus.row_iter().map(|row| {
            row.col_indices()
                .iter()
                .zip(row.values())
                .map(|(&k, y)| y * v[k])
                .sum::<Complex64>()
        }),
    )
}

/// Computes the derivatives of the complex power injections with respect to
/// voltage magnitudes and angles.
///
/// One value is returned per stored entry of `y_bus`, in the order of
/// `y_bus.values()`, so both derivatives share the admittance pattern:
///
/// * `dS/dVm = diag(V) conj(Ybus diag(Vnorm)) + conj(diag(I)) diag(Vnorm)`
/// * `dS/dVa = j diag(V) conj(diag(I) - Ybus diag(V))`
///
/// # Notes
///
/// * Every diagonal entry must be stored in `y_bus`, otherwise the diagonal
///   terms are lost.
/// * This method is from MatPower:
///   R. D. Zimmerman, "AC Power Flows, Generalized OPF Costs and
///   their Derivatives using Complex Matrix Notation", MATPOWER
///   Technical Note 2, February 2010.
#[allow(non_snake_case)]
pub fn dSbus_dV(
    y_bus: &CsrMatrix<Complex64>,
    v: &DVector<Complex64>,
) -> (Vec<Complex64>, Vec<Complex64>) {
    let i_bus = bus_currents(y_bus, v);
    let v_norm = v.map(|e| {
        let m = e.norm();
        if m > 0.0 { e / m } else { Complex64::new(1.0, 0.0) }
    });

    let nnz = y_bus.nnz();
    let mut ds_dvm = Vec::with_capacity(nnz);
    let mut ds_dva = Vec::with_capacity(nnz);
    for (i, row) in y_bus.row_iter().enumerate() {
        for (&k, &y) in row.col_indices().iter().zip(row.values()) {
            let mut dvm = v[i] * (y * v_norm[k]).conj();
            let mut dva = -y * v[k];
            if i == k {
                dvm += i_bus[i].conj() * v_norm[i];
                dva += i_bus[i];
            }
            ds_dvm.push(dvm);
            ds_dva.push(Complex64::i() * v[i] * dva.conj());
        }
    }
    (ds_dvm, ds_dva)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    fn two_node() -> CsrMatrix<Complex64> {
        let y = Complex64::new(2.0, -8.0);
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, y);
        coo.push(0, 1, -y);
        coo.push(1, 0, -y);
        coo.push(1, 1, y);
        CsrMatrix::from(&coo)
    }

    fn power(y_bus: &CsrMatrix<Complex64>, v: &DVector<Complex64>) -> DVector<Complex64> {
        v.component_mul(&bus_currents(y_bus, v).conjugate())
    }

    #[test]
    fn matches_finite_differences() {
        let y_bus = two_node();
        let (vm, va) = ([1.0, 0.97], [0.0, -0.05]);
        let volt = |vm: [f64; 2], va: [f64; 2]| {
            DVector::from_fn(2, |i, _| Complex64::from_polar(vm[i], va[i]))
        };
        let v = volt(vm, va);
        let (d_vm, d_va) = dSbus_dV(&y_bus, &v);
        let h = 1e-7;
        let step = Complex64::new(h, 0.0);

        // entries are stored row-major: (0,0) (0,1) (1,0) (1,1)
        for k in 0..2 {
            let mut vm2 = vm;
            vm2[k] += h;
            let mut va2 = va;
            va2[k] += h;
            let s0 = power(&y_bus, &v);
            let fd_vm = (power(&y_bus, &volt(vm2, va)) - &s0) / step;
            let fd_va = (power(&y_bus, &volt(vm, va2)) - &s0) / step;
            for i in 0..2 {
                assert!((fd_vm[i] - d_vm[2 * i + k]).norm() < 1e-5);
                assert!((fd_va[i] - d_va[2 * i + k]).norm() < 1e-5);
            }
        }
    }
}
