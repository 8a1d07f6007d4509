//! Conversion of a grid model into the per-unit network seen by the solver.

pub mod admittance;
pub mod merge;

use std::collections::VecDeque;
use std::f64::consts::PI;

use nalgebra::{DVector, vector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex64;
use num_traits::Zero;
use tracing::debug;

pub use admittance::*;
use merge::NodeMerge;

use super::PowerFlowError;
use super::model::GridModel;
use super::newtonpf::newton_pf;
use super::solver::Solve;
use crate::io::pandapower::*;

/// Nominal voltage above which transformer phase shifts are applied.
const ANGLE_VOLTAGE_KV: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Slack,
    PV,
    PQ,
    /// Not connected to any slack; excluded from the solve.
    Isolated,
}

/// Voltage dependent injection of a node in per unit:
/// `S(vm) = s_const + s_current * vm + s_impedance * vm^2`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeInjection {
    pub s_const: Complex64,
    pub s_current: Complex64,
    pub s_impedance: Complex64,
}

impl NodeInjection {
    pub fn at(&self, vm: f64) -> Complex64 {
        self.s_const + self.s_current * vm + self.s_impedance * vm * vm
    }

    /// Derivative of the injection with respect to the voltage magnitude.
    pub fn d_dvm(&self, vm: f64) -> Complex64 {
        self.s_current + self.s_impedance * (2.0 * vm)
    }

    fn is_zero(&self) -> bool {
        self.s_const.is_zero() && self.s_current.is_zero() && self.s_impedance.is_zero()
    }
}

/// Represents a node with specified active power and voltage magnitude.
#[derive(Debug, Clone, Copy)]
pub struct PVNode {
    pub node: usize,
    /// The voltage magnitude setpoint.
    pub v: f64,
}

/// Represents a slack node with voltage and phase.
#[derive(Debug, Clone, Copy)]
pub struct ExtGridNode {
    pub node: usize,
    pub v: f64,
    /// Phase angle in radians.
    pub phase: f64,
}

/// Represents a power flow network in per unit on `s_base`.
#[derive(Debug, Clone)]
pub struct PFNetwork {
    /// The base power of the network in MVA.
    pub s_base: f64,
    /// Node of each model bus; `None` for buses out of service.
    pub node_of_bus: Vec<Option<usize>>,
    /// Nominal voltage of each node in kV.
    pub node_vn_kv: Vec<f64>,
    pub node_type: Vec<NodeType>,
    pub injections: Vec<NodeInjection>,
    pub pv_nodes: Vec<PVNode>,
    pub ext: Vec<ExtGridNode>,
    /// The list of branches with admittance and port information in the network.
    pub y_br: Vec<AdmittanceBranch>,
    /// Branch of each model line, if energised.
    pub line_branch: Vec<Option<usize>>,
    /// Branch of each model transformer, if energised.
    pub trafo_branch: Vec<Option<usize>>,
    /// Initial voltage angles in radians.
    pub angle_init: Vec<f64>,
    pub calculate_voltage_angles: bool,
}

/// A trait for running power flow analysis.
pub trait RunPF {
    /// Creates the nodal admittance matrix (Ybus) of the power flow network.
    fn create_y_bus(&self) -> CsrMatrix<Complex64>;

    /// Creates the initial voltage vector of the power flow network.
    fn create_v_init(&self) -> DVector<Complex64>;

    /// Runs the power flow analysis and returns node voltages and iterations.
    fn run_pf<S: Solve>(
        &self,
        solver: &mut S,
        max_it: Option<usize>,
        tol: Option<f64>,
    ) -> Result<(DVector<Complex64>, usize), PowerFlowError>;
}

fn bus_name(model: &GridModel, bus: usize) -> &str {
    model.bus[bus].name.as_deref().unwrap_or_default()
}

/// Converts a line to its equivalent admittance branch.
fn line_to_admit(
    idx: usize,
    line: &Line,
    port: Port2,
    vn_kv: f64,
    s_base: f64,
    f_hz: f64,
) -> Result<AdmittanceBranch, PowerFlowError> {
    let name = line.name.as_deref().unwrap_or_default();
    if line.parallel == 0 {
        return Err(PowerFlowError::Model(format!(
            "Line \"{name}\" has no parallel systems."
        )));
    }
    let parallel = line.parallel as f64;
    let z_base = vn_kv * vn_kv / s_base;
    let rl = line.r_ohm_per_km * line.length_km / parallel;
    let xl = line.x_ohm_per_km * line.length_km / parallel;
    if rl == 0.0 && xl == 0.0 {
        return Err(PowerFlowError::Model(format!(
            "Line \"{name}\" has zero impedance."
        )));
    }
    let b = 2.0 * PI * f_hz * 1e-9 * line.c_nf_per_km * line.length_km * parallel;
    let g = line.g_us_per_km * 1e-6 * line.length_km * parallel;
    let shunt = 0.5 * Complex64::new(g, b) * z_base;
    Ok(AdmittanceBranch {
        origin: BranchOrigin::Line(idx),
        port,
        y: Admittance(z_base / Complex64::new(rl, xl)),
        y_shunt_from: shunt,
        y_shunt_to: shunt,
        tap: Complex64::new(1.0, 0.0),
    })
}

/// Converts a transformer to its equivalent admittance branch, hv side first.
fn trafo_to_admit(
    idx: usize,
    item: &Transformer,
    port: Port2,
    (vn_hv_bus, vn_lv_bus): (f64, f64),
    s_base: f64,
    with_shift: bool,
) -> Result<AdmittanceBranch, PowerFlowError> {
    let name = item.name.as_deref().unwrap_or_default();
    if item.sn_mva <= 0.0 || item.vk_percent <= 0.0 || item.vn_lv_kv <= 0.0 || item.vn_hv_kv <= 0.0
    {
        return Err(PowerFlowError::Model(format!(
            "Transformer \"{name}\" needs positive sn_mva, vk_percent and rated voltages."
        )));
    }
    if item.parallel == 0 {
        return Err(PowerFlowError::Model(format!(
            "Transformer \"{name}\" has no parallel units."
        )));
    }
    let parallel = item.parallel as f64;

    // short circuit impedance referred to the lv side
    let z_rated = item.vn_lv_kv * item.vn_lv_kv / item.sn_mva;
    let z = item.vk_percent * 0.01 * z_rated;
    let re = item.vkr_percent * 0.01 * z_rated;
    let im = (z.powi(2) - re.powi(2)).max(0.0).sqrt();
    let z_base = vn_lv_bus * vn_lv_bus / s_base;
    let y = parallel * z_base / Complex64::new(re, im);

    // magnetising branch, split over both sides
    let ym = item.i0_percent * 0.01 * item.sn_mva / s_base;
    let gm = 0.001 * item.pfe_kw / s_base;
    let bm = (ym.powi(2) - gm.powi(2)).max(0.0).sqrt();
    let ratio_correction = (vn_lv_bus / item.vn_lv_kv).powi(2);
    let y_m = Complex64::new(gm, -bm) * parallel * ratio_correction;

    let steps = match (item.tap_pos, item.tap_neutral) {
        (Some(pos), Some(neutral)) if pos.is_finite() && neutral.is_finite() => pos - neutral,
        _ => 0.0,
    };
    let du = steps * 0.01 * item.tap_step_percent.unwrap_or(0.0);
    let nominal = (item.vn_hv_kv / item.vn_lv_kv) / (vn_hv_bus / vn_lv_bus);
    let ratio = match item.tap_side.as_deref() {
        Some("lv") => nominal / (1.0 + du),
        _ => nominal * (1.0 + du),
    };
    let shift = if with_shift {
        item.shift_degree + steps * item.tap_step_degree.unwrap_or(0.0)
    } else {
        0.0
    };

    Ok(AdmittanceBranch {
        origin: BranchOrigin::Trafo(idx),
        port,
        y: Admittance(y),
        y_shunt_from: 0.5 * y_m,
        y_shunt_to: 0.5 * y_m,
        tap: Complex64::from_polar(ratio, shift.to_radians()),
    })
}

/// Converts a closed bus-bus switch with impedance into a branch.
fn switch_to_admit(idx: usize, item: &Switch, port: Port2, vn_kv: f64, s_base: f64) -> AdmittanceBranch {
    let z_base = vn_kv * vn_kv / s_base;
    AdmittanceBranch {
        origin: BranchOrigin::Switch(idx),
        port,
        y: Admittance(Complex64::new(z_base / item.z_ohm, 0.0)),
        y_shunt_from: Complex64::zero(),
        y_shunt_to: Complex64::zero(),
        tap: Complex64::new(1.0, 0.0),
    }
}

/// Appends a node that copies the voltage level and owner bus of `node`.
fn aux_node(node: usize, vn_kv: &mut Vec<f64>, owner: &mut Vec<usize>) -> usize {
    let (level, bus) = (vn_kv[node], owner[node]);
    vn_kv.push(level);
    owner.push(bus);
    vn_kv.len() - 1
}

/// Which ends of branches are opened by switches, per line and transformer.
fn open_ends(model: &GridModel) -> (Vec<[bool; 2]>, Vec<[bool; 2]>) {
    let mut lines = vec![[false; 2]; model.line.len()];
    let mut trafos = vec![[false; 2]; model.trafo.len()];
    for switch in model.switch.iter().filter(|s| !s.closed) {
        match switch.et {
            SwitchType::SwitchBusLine => {
                let line = &model.line[switch.element];
                if line.from_bus == switch.bus {
                    lines[switch.element][0] = true;
                } else if line.to_bus == switch.bus {
                    lines[switch.element][1] = true;
                }
            }
            SwitchType::SwitchBusTransformer => {
                let trafo = &model.trafo[switch.element];
                if trafo.hv_bus == switch.bus {
                    trafos[switch.element][0] = true;
                } else if trafo.lv_bus == switch.bus {
                    trafos[switch.element][1] = true;
                }
            }
            SwitchType::SwitchTwoBuses | SwitchType::SwitchBusTransformer3w => {}
        }
    }
    (lines, trafos)
}

impl PFNetwork {
    /// Builds the solver network of `model`.
    pub fn from_model(model: &GridModel) -> Result<Self, PowerFlowError> {
        let s_base = model.sn_mva;
        for bus in model.bus.iter().filter(|b| b.in_service) {
            if !(bus.vn_kv > 0.0) {
                return Err(PowerFlowError::Model(format!(
                    "Bus \"{}\" needs a positive vn_kv.",
                    bus.name.as_deref().unwrap_or_default()
                )));
            }
        }
        let in_service = |b: usize| model.bus[b].in_service;

        // Step 1: merge buses joined by closed ideal bus-bus switches
        let mut merge = NodeMerge::new(model.bus.len());
        for switch in &model.switch {
            if switch.closed
                && switch.et == SwitchType::SwitchTwoBuses
                && switch.z_ohm == 0.0
                && in_service(switch.bus)
                && in_service(switch.element)
            {
                merge.union(switch.bus, switch.element);
            }
        }
        let (node_of_bus, n_nodes) = merge.node_mapping(in_service);
        let mut node_vn_kv = vec![0.0; n_nodes];
        let mut node_bus = vec![0; n_nodes];
        for (bus, node) in node_of_bus.iter().enumerate().rev() {
            if let Some(node) = node {
                node_vn_kv[*node] = model.bus[bus].vn_kv;
                node_bus[*node] = bus;
            }
        }
        let calculate_voltage_angles = model
            .bus
            .iter()
            .any(|b| b.in_service && b.vn_kv > ANGLE_VOLTAGE_KV);

        // Step 2: branches; opened branch ends get an auxiliary node
        let (line_open, trafo_open) = open_ends(model);
        let mut y_br = Vec::new();
        let mut line_branch = vec![None; model.line.len()];
        for (idx, line) in model.line.iter().enumerate() {
            let (Some(f), Some(t)) = (node_of_bus[line.from_bus], node_of_bus[line.to_bus]) else {
                continue;
            };
            if !line.in_service {
                continue;
            }
            let [open_f, open_t] = line_open[idx];
            let f = if open_f { aux_node(f, &mut node_vn_kv, &mut node_bus) } else { f };
            let t = if open_t { aux_node(t, &mut node_vn_kv, &mut node_bus) } else { t };
            let vn_kv = node_vn_kv[f];
            line_branch[idx] = Some(y_br.len());
            y_br.push(line_to_admit(idx, line, Port2(vector![f, t]), vn_kv, s_base, model.f_hz)?);
        }
        let mut trafo_branch = vec![None; model.trafo.len()];
        for (idx, trafo) in model.trafo.iter().enumerate() {
            let (Some(hv), Some(lv)) = (node_of_bus[trafo.hv_bus], node_of_bus[trafo.lv_bus]) else {
                continue;
            };
            if !trafo.in_service {
                continue;
            }
            let [open_hv, open_lv] = trafo_open[idx];
            let hv = if open_hv { aux_node(hv, &mut node_vn_kv, &mut node_bus) } else { hv };
            let lv = if open_lv { aux_node(lv, &mut node_vn_kv, &mut node_bus) } else { lv };
            let vn = (node_vn_kv[hv], node_vn_kv[lv]);
            trafo_branch[idx] = Some(y_br.len());
            y_br.push(trafo_to_admit(
                idx,
                trafo,
                Port2(vector![hv, lv]),
                vn,
                s_base,
                calculate_voltage_angles,
            )?);
        }
        for (idx, switch) in model.switch.iter().enumerate() {
            if !(switch.closed && switch.et == SwitchType::SwitchTwoBuses && switch.z_ohm > 0.0) {
                continue;
            }
            if let (Some(a), Some(b)) = (node_of_bus[switch.bus], node_of_bus[switch.element]) {
                y_br.push(switch_to_admit(idx, switch, Port2(vector![a, b]), node_vn_kv[a], s_base));
            }
        }
        let n_nodes = node_vn_kv.len();

        // Step 3: injections and node types
        let mut injections = vec![NodeInjection::default(); n_nodes];
        for load in model.load.iter().filter(|x| x.in_service) {
            let Some(node) = node_of_bus[load.bus] else { continue };
            let s = Complex64::new(load.p_mw, load.q_mvar) * load.scaling / s_base;
            let z = load.const_z_percent * 0.01;
            let i = load.const_i_percent * 0.01;
            let inj = &mut injections[node];
            inj.s_const -= s * (1.0 - z - i);
            inj.s_current -= s * i;
            inj.s_impedance -= s * z;
        }
        for storage in model.storage.iter().filter(|x| x.in_service) {
            let Some(node) = node_of_bus[storage.bus] else { continue };
            injections[node].s_const -=
                Complex64::new(storage.p_mw, storage.q_mvar) * storage.scaling / s_base;
        }

        let mut node_type = vec![NodeType::PQ; n_nodes];
        let mut ext = Vec::new();
        for grid in model.ext_grid.iter().filter(|x| x.in_service) {
            let Some(node) = node_of_bus[grid.bus] else { continue };
            if node_type[node] != NodeType::Slack {
                node_type[node] = NodeType::Slack;
                ext.push(ExtGridNode {
                    node,
                    v: grid.vm_pu,
                    phase: grid.va_degree.to_radians(),
                });
            }
        }
        for generator in model.gen_.iter().filter(|x| x.in_service) {
            let Some(node) = node_of_bus[generator.bus] else { continue };
            injections[node].s_const += Complex64::new(generator.p_mw * generator.scaling / s_base, 0.0);
            if generator.slack && node_type[node] != NodeType::Slack {
                node_type[node] = NodeType::Slack;
                ext.push(ExtGridNode {
                    node,
                    v: generator.vm_pu,
                    phase: 0.0,
                });
            }
        }
        let mut pv_nodes = Vec::new();
        for generator in model.gen_.iter().filter(|x| x.in_service) {
            let Some(node) = node_of_bus[generator.bus] else { continue };
            if node_type[node] == NodeType::PQ {
                node_type[node] = NodeType::PV;
                pv_nodes.push(PVNode {
                    node,
                    v: generator.vm_pu,
                });
            }
        }

        let mut net = PFNetwork {
            s_base,
            node_of_bus,
            node_vn_kv,
            node_type,
            injections,
            pv_nodes,
            ext,
            y_br,
            line_branch,
            trafo_branch,
            angle_init: vec![0.0; n_nodes],
            calculate_voltage_angles,
        };

        // Step 4: nodes out of reach of every slack leave the solve
        let reached = net.propagate_angles();
        for node in 0..n_nodes {
            if reached[node] {
                continue;
            }
            if net.node_type[node] == NodeType::PV || !net.injections[node].is_zero() {
                return Err(PowerFlowError::UnsuppliedIsland(
                    bus_name(model, node_bus[node]).to_owned(),
                ));
            }
            net.node_type[node] = NodeType::Isolated;
        }
        net.pv_nodes.retain(|pv| reached[pv.node]);

        debug!(
            nodes = n_nodes,
            branches = net.y_br.len(),
            slack = net.ext.len(),
            pv = net.pv_nodes.len(),
            "power flow network assembled"
        );
        Ok(net)
    }

    pub fn n_nodes(&self) -> usize {
        self.node_vn_kv.len()
    }

    /// Walks the branches outward from every slack, recording initial angles
    /// that follow transformer phase shifts. Returns which nodes were reached.
    fn propagate_angles(&mut self) -> Vec<bool> {
        let n = self.n_nodes();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for br in &self.y_br {
            let (f, t) = (br.port.from_node(), br.port.to_node());
            let shift = br.tap.arg();
            adjacency[f].push((t, -shift));
            adjacency[t].push((f, shift));
        }
        let mut reached = vec![false; n];
        let mut queue = VecDeque::new();
        for slack in &self.ext {
            if !reached[slack.node] {
                reached[slack.node] = true;
                self.angle_init[slack.node] = slack.phase;
                queue.push_back(slack.node);
            }
        }
        while let Some(node) = queue.pop_front() {
            for &(next, delta) in &adjacency[node] {
                if !reached[next] {
                    reached[next] = true;
                    self.angle_init[next] = self.angle_init[node] + delta;
                    queue.push_back(next);
                }
            }
        }
        reached
    }

    fn nodes_of_type(&self, kind: NodeType) -> Vec<usize> {
        (0..self.n_nodes())
            .filter(|&n| self.node_type[n] == kind)
            .collect()
    }
}

impl RunPF for PFNetwork {
    fn create_y_bus(&self) -> CsrMatrix<Complex64> {
        let n = self.n_nodes();
        let mut coo = CooMatrix::new(n, n);
        // explicit diagonal so every node keeps its self entry in the pattern
        for i in 0..n {
            coo.push(i, i, Complex64::zero());
        }
        for br in &self.y_br {
            let (f, t) = (br.port.from_node(), br.port.to_node());
            let [[yff, yft], [ytf, ytt]] = br.stamp();
            coo.push(f, f, yff);
            coo.push(f, t, yft);
            coo.push(t, f, ytf);
            coo.push(t, t, ytt);
        }
        CsrMatrix::from(&coo)
    }

    fn create_v_init(&self) -> DVector<Complex64> {
        let mut v = DVector::from_fn(self.n_nodes(), |i, _| match self.node_type[i] {
            NodeType::Isolated => Complex64::zero(),
            _ => Complex64::from_polar(1.0, self.angle_init[i]),
        });
        for pv in &self.pv_nodes {
            v[pv.node] = Complex64::from_polar(pv.v, self.angle_init[pv.node]);
        }
        for slack in &self.ext {
            v[slack.node] = Complex64::from_polar(slack.v, slack.phase);
        }
        v
    }

    fn run_pf<S: Solve>(
        &self,
        solver: &mut S,
        max_it: Option<usize>,
        tol: Option<f64>,
    ) -> Result<(DVector<Complex64>, usize), PowerFlowError> {
        let y_bus = self.create_y_bus();
        let v_init = self.create_v_init();
        let pv = self.nodes_of_type(NodeType::PV);
        let pq = self.nodes_of_type(NodeType::PQ);
        newton_pf(&y_bus, &self.injections, &v_init, &pv, &pq, tol, max_it, solver)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::basic::model::build_model;
    use serde_json::{Value, json};

    pub(crate) fn model_of(v: Value) -> GridModel {
        build_model(v.as_object().unwrap()).unwrap()
    }

    #[test]
    fn closed_bus_switch_merges_nodes() {
        let model = model_of(json!({
            "a": {"etype": "bus", "vn_kv": 20.0},
            "b": {"etype": "bus", "vn_kv": 20.0},
            "c": {"etype": "bus", "vn_kv": 20.0},
            "g": {"etype": "ext_grid", "bus": "a"},
            "s": {"etype": "switch", "bus": "a", "element": "b", "et": "b"},
        }));
        let net = PFNetwork::from_model(&model).unwrap();
        assert_eq!(net.node_of_bus[0], net.node_of_bus[1]);
        assert_ne!(net.node_of_bus[0], net.node_of_bus[2]);
        assert_eq!(net.n_nodes(), 2);
        // "c" has nothing attached and no supply
        assert_eq!(net.node_type[net.node_of_bus[2].unwrap()], NodeType::Isolated);
    }

    #[test]
    fn open_line_switch_detaches_line_end() {
        let model = model_of(json!({
            "a": {"etype": "bus", "vn_kv": 0.4},
            "b": {"etype": "bus", "vn_kv": 0.4},
            "g": {"etype": "ext_grid", "bus": "a"},
            "l": {"etype": "line", "from_bus": "a", "to_bus": "b", "length_km": 0.1,
                  "std_type": "NAYY 4x50 SE"},
            "s": {"etype": "switch", "bus": "b", "element": "l", "et": "l", "closed": false},
        }));
        let net = PFNetwork::from_model(&model).unwrap();
        let br = &net.y_br[net.line_branch[0].unwrap()];
        assert_eq!(br.port.from_node(), net.node_of_bus[0].unwrap());
        assert_eq!(br.port.to_node(), 2);
        assert_eq!(net.n_nodes(), 3);
    }

    #[test]
    fn unsupplied_load_is_reported() {
        let model = model_of(json!({
            "a": {"etype": "bus", "vn_kv": 20.0},
            "load": {"etype": "load", "bus": "a", "p_mw": 1.0},
        }));
        assert_eq!(
            PFNetwork::from_model(&model).unwrap_err(),
            PowerFlowError::UnsuppliedIsland("a".into())
        );
    }

    #[test]
    fn zero_impedance_line_is_a_model_error() {
        let model = model_of(json!({
            "a": {"etype": "bus", "vn_kv": 20.0},
            "b": {"etype": "bus", "vn_kv": 20.0},
            "g": {"etype": "ext_grid", "bus": "a"},
            "l": {"etype": "line", "from_bus": "a", "to_bus": "b", "length_km": 1.0,
                  "std_type": "NAYY 4x50 SE", "r_ohm_per_km": 0.0, "x_ohm_per_km": 0.0},
        }));
        assert!(matches!(
            PFNetwork::from_model(&model),
            Err(PowerFlowError::Model(_))
        ));
    }

    #[test]
    fn hv_networks_carry_trafo_shift_into_initial_angles() {
        let model = model_of(json!({
            "hv": {"etype": "bus", "vn_kv": 110.0},
            "mv": {"etype": "bus", "vn_kv": 20.0},
            "g": {"etype": "ext_grid", "bus": "hv"},
            "t": {"etype": "trafo", "hv_bus": "hv", "lv_bus": "mv", "std_type": "25 MVA 110/20 kV"},
        }));
        let net = PFNetwork::from_model(&model).unwrap();
        assert!(net.calculate_voltage_angles);
        let mv = net.node_of_bus[1].unwrap();
        assert!((net.angle_init[mv].to_degrees() + 150.0).abs() < 1e-9);
    }

    #[test]
    fn ybus_rows_sum_to_zero_without_shunts() {
        let model = model_of(json!({
            "a": {"etype": "bus", "vn_kv": 20.0},
            "b": {"etype": "bus", "vn_kv": 20.0},
            "g": {"etype": "ext_grid", "bus": "a"},
            "l": {"etype": "line", "from_bus": "a", "to_bus": "b", "length_km": 2.0,
                  "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV", "c_nf_per_km": 0.0},
        }));
        let net = PFNetwork::from_model(&model).unwrap();
        let y = net.create_y_bus();
        for row in y.row_iter() {
            let sum: Complex64 = row.values().iter().sum();
            assert!(sum.norm() < 1e-9);
        }
    }
}
