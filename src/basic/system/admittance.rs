use nalgebra::Complex;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Represents an admittance value in a power system.
///
/// `Admittance` is a wrapper around a complex number representing the admittance value.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct Admittance(pub Complex<f64>);

/// Represents a port with two node indices, `[from, to]`.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Port2(pub nalgebra::Vector2<usize>);

impl Port2 {
    pub fn from_node(&self) -> usize {
        self.0[0]
    }

    pub fn to_node(&self) -> usize {
        self.0[1]
    }
}

/// Element a branch was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOrigin {
    Line(usize),
    Trafo(usize),
    Switch(usize),
}

/// A pi-model branch in per unit.
///
/// The off-nominal ratio `tap` sits on the from side, so that the to-side
/// voltage of an unloaded branch is `v_from / tap`.
#[derive(Debug, Clone)]
pub struct AdmittanceBranch {
    pub origin: BranchOrigin,
    pub port: Port2,
    /// Series admittance.
    pub y: Admittance,
    pub y_shunt_from: Complex64,
    pub y_shunt_to: Complex64,
    pub tap: Complex64,
}

impl AdmittanceBranch {
    /// Two-port admittance entries `[[yff, yft], [ytf, ytt]]`.
    pub fn stamp(&self) -> [[Complex64; 2]; 2] {
        let ys = self.y.0;
        let t = self.tap;
        let yff = (ys + self.y_shunt_from) / t.norm_sqr();
        let yft = -ys / t.conj();
        let ytf = -ys / t;
        let ytt = ys + self.y_shunt_to;
        [[yff, yft], [ytf, ytt]]
    }

    /// Currents injected into the branch at both ports.
    pub fn currents(&self, v_from: Complex64, v_to: Complex64) -> (Complex64, Complex64) {
        let [[yff, yft], [ytf, ytt]] = self.stamp();
        (yff * v_from + yft * v_to, ytf * v_from + ytt * v_to)
    }
}
