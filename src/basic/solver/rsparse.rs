use rsparse::{
    data::{self, Numeric, Symb},
    lsolve, lu, sqr, usolve,
};

use super::Solve;

/// LU solver on top of `rsparse`. The symbolic analysis is kept between
/// calls, so consecutive systems must share one sparsity pattern.
///
/// Scalar systems are divided directly; the `rsparse` ordering does not
/// accept a dimension below two.
#[derive(Default)]
pub struct RSparseSolver {
    x: Vec<f64>,
    symbolic: Option<Symb>,
}

#[allow(non_snake_case)]
impl Solve for RSparseSolver {
    fn solve(
        &mut self,
        Ap: &mut [usize],
        Ai: &mut [usize],
        Ax: &mut [f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<(), &'static str> {
        if Ap.len() != n + 1 || b.len() != n {
            return Err("matrix and right-hand side dimensions do not match");
        }
        if n == 1 {
            let pivot: f64 = Ax[Ap[0]..Ap[1]].iter().sum();
            if pivot == 0.0 || !pivot.is_finite() {
                return Err("LU factorization failed");
            }
            b[0] /= pivot;
            return Ok(());
        }
        let a = data::Sprs {
            m: n,
            n,
            i: Ai.to_vec(),
            p: Ap.iter().map(|&v| v as isize).collect(),
            x: Ax.to_vec(),
            nzmax: Ax.len(),
        };
        let symbolic = self.symbolic.get_or_insert_with(|| sqr(&a, 1, false));
        let numeric = lu(&a, symbolic, 1e-6).map_err(|_| "LU factorization failed")?;
        self.x.resize(n, 0.0);
        ipvec(&numeric.pinv, b, &mut self.x); // x = P*b
        lsolve(&numeric.l, &mut self.x); // x = L\x
        usolve(&numeric.u, &mut self.x); // x = U\x
        ipvec(&symbolic.q, &self.x, b); // b = Q*x
        Ok(())
    }
}

fn ipvec<T: Numeric<T>>(p: &Option<Vec<isize>>, b: &[T], x: &mut [T]) {
    match p {
        Some(pvec) => {
            for k in 0..b.len() {
                x[pvec[k] as usize] = b[k];
            }
        }
        None => x.copy_from_slice(b),
    }
}
