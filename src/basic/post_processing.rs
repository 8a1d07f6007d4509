//! Result tables computed from a converged power flow.
//!
//! Tables follow the pandapower `res_*` layout: one row per element, named
//! after the element, with consumer sign convention for buses and loads and
//! generator sign convention for generators and external grids.

mod res_display;

use std::collections::HashMap;

use nalgebra::DVector;
use num_complex::Complex64;
use res_display::*;
use tabled::{Table, settings::Style};
use tracing::{Level, debug, enabled};

use super::dsbus_dv::bus_currents;
use super::model::{ElementKind, GridModel};
use super::system::{AdmittanceBranch, NodeType, PFNetwork, RunPF};

/// A typed result row that can be flattened into named columns.
pub trait ResultRecord {
    const COLUMNS: &'static [&'static str];
    fn values(&self) -> Vec<f64>;
}

macro_rules! result_row {
    ($(#[$meta:meta])* $name:ident { $($field:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq)]
        pub struct $name {
            $(pub $field: f64,)*
        }

        impl ResultRecord for $name {
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn values(&self) -> Vec<f64> {
                vec![$(self.$field),*]
            }
        }
    };
}

result_row!(
    /// Bus voltage and net consumption.
    BusResult { vm_pu, va_degree, p_mw, q_mvar }
);
result_row!(LoadResult { p_mw, q_mvar });
result_row!(StorageResult { p_mw, q_mvar });
result_row!(GenResult { p_mw, q_mvar, va_degree, vm_pu });
result_row!(ExtGridResult { p_mw, q_mvar });
result_row!(LineResult {
    p_from_mw,
    q_from_mvar,
    p_to_mw,
    q_to_mvar,
    pl_mw,
    ql_mvar,
    i_from_ka,
    i_to_ka,
    i_ka,
    vm_from_pu,
    va_from_degree,
    vm_to_pu,
    va_to_degree,
    loading_percent,
});
result_row!(TrafoResult {
    p_hv_mw,
    q_hv_mvar,
    p_lv_mw,
    q_lv_mvar,
    pl_mw,
    ql_mvar,
    i_hv_ka,
    i_lv_ka,
    vm_hv_pu,
    va_hv_degree,
    vm_lv_pu,
    va_lv_degree,
    loading_percent,
});
result_row!(
    /// Per-phase bus voltages and consumption.
    BusResult3ph {
        vm_a_pu, va_a_degree, vm_b_pu, va_b_degree, vm_c_pu, va_c_degree,
        p_a_mw, q_a_mvar, p_b_mw, q_b_mvar, p_c_mw, q_c_mvar,
        unbalance_percent,
    }
);
result_row!(ExtGridResult3ph {
    p_a_mw, q_a_mvar, p_b_mw, q_b_mvar, p_c_mw, q_c_mvar,
});
result_row!(LineResult3ph {
    p_a_from_mw, q_a_from_mvar, p_b_from_mw, q_b_from_mvar, p_c_from_mw, q_c_from_mvar,
    p_a_to_mw, q_a_to_mvar, p_b_to_mw, q_b_to_mvar, p_c_to_mw, q_c_to_mvar,
    p_a_l_mw, q_a_l_mvar, p_b_l_mw, q_b_l_mvar, p_c_l_mw, q_c_l_mvar,
    i_a_from_ka, i_a_to_ka, i_b_from_ka, i_b_to_ka, i_c_from_ka, i_c_to_ka,
    i_a_ka, i_b_ka, i_c_ka, i_n_from_ka, i_n_to_ka, i_n_ka,
    loading_a_percent, loading_b_percent, loading_c_percent, loading_percent,
});
result_row!(TrafoResult3ph {
    p_a_hv_mw, q_a_hv_mvar, p_b_hv_mw, q_b_hv_mvar, p_c_hv_mw, q_c_hv_mvar,
    p_a_lv_mw, q_a_lv_mvar, p_b_lv_mw, q_b_lv_mvar, p_c_lv_mw, q_c_lv_mvar,
    p_a_l_mw, q_a_l_mvar, p_b_l_mw, q_b_l_mvar, p_c_l_mw, q_c_l_mvar,
    i_a_hv_ka, i_a_lv_ka, i_b_hv_ka, i_b_lv_ka, i_c_hv_ka, i_c_lv_ka,
    loading_a_percent, loading_b_percent, loading_c_percent, loading_percent,
});

/// Phase angles of a balanced system in degrees, wrapped to (-180, 180].
fn phase_angles(va_degree: f64) -> [f64; 3] {
    let wrap = |a: f64| {
        let a = (a + 180.0).rem_euclid(360.0) - 180.0;
        if a == -180.0 { 180.0 } else { a }
    };
    [va_degree, wrap(va_degree - 120.0), wrap(va_degree + 120.0)]
}

impl From<&BusResult> for BusResult3ph {
    fn from(r: &BusResult) -> Self {
        let [a, b, c] = phase_angles(r.va_degree);
        let (p, q) = (r.p_mw / 3.0, r.q_mvar / 3.0);
        BusResult3ph {
            vm_a_pu: r.vm_pu,
            va_a_degree: a,
            vm_b_pu: r.vm_pu,
            va_b_degree: b,
            vm_c_pu: r.vm_pu,
            va_c_degree: c,
            p_a_mw: p,
            q_a_mvar: q,
            p_b_mw: p,
            q_b_mvar: q,
            p_c_mw: p,
            q_c_mvar: q,
            unbalance_percent: 0.0,
        }
    }
}

impl From<&ExtGridResult> for ExtGridResult3ph {
    fn from(r: &ExtGridResult) -> Self {
        let (p, q) = (r.p_mw / 3.0, r.q_mvar / 3.0);
        ExtGridResult3ph {
            p_a_mw: p,
            q_a_mvar: q,
            p_b_mw: p,
            q_b_mvar: q,
            p_c_mw: p,
            q_c_mvar: q,
        }
    }
}

impl From<&LineResult> for LineResult3ph {
    fn from(r: &LineResult) -> Self {
        let third = |x: f64| x / 3.0;
        LineResult3ph {
            p_a_from_mw: third(r.p_from_mw),
            q_a_from_mvar: third(r.q_from_mvar),
            p_b_from_mw: third(r.p_from_mw),
            q_b_from_mvar: third(r.q_from_mvar),
            p_c_from_mw: third(r.p_from_mw),
            q_c_from_mvar: third(r.q_from_mvar),
            p_a_to_mw: third(r.p_to_mw),
            q_a_to_mvar: third(r.q_to_mvar),
            p_b_to_mw: third(r.p_to_mw),
            q_b_to_mvar: third(r.q_to_mvar),
            p_c_to_mw: third(r.p_to_mw),
            q_c_to_mvar: third(r.q_to_mvar),
            p_a_l_mw: third(r.pl_mw),
            q_a_l_mvar: third(r.ql_mvar),
            p_b_l_mw: third(r.pl_mw),
            q_b_l_mvar: third(r.ql_mvar),
            p_c_l_mw: third(r.pl_mw),
            q_c_l_mvar: third(r.ql_mvar),
            // phase currents of a balanced system equal the line current
            i_a_from_ka: r.i_from_ka,
            i_a_to_ka: r.i_to_ka,
            i_b_from_ka: r.i_from_ka,
            i_b_to_ka: r.i_to_ka,
            i_c_from_ka: r.i_from_ka,
            i_c_to_ka: r.i_to_ka,
            i_a_ka: r.i_ka,
            i_b_ka: r.i_ka,
            i_c_ka: r.i_ka,
            i_n_from_ka: 0.0,
            i_n_to_ka: 0.0,
            i_n_ka: 0.0,
            loading_a_percent: r.loading_percent,
            loading_b_percent: r.loading_percent,
            loading_c_percent: r.loading_percent,
            loading_percent: r.loading_percent,
        }
    }
}

impl From<&TrafoResult> for TrafoResult3ph {
    fn from(r: &TrafoResult) -> Self {
        let third = |x: f64| x / 3.0;
        TrafoResult3ph {
            p_a_hv_mw: third(r.p_hv_mw),
            q_a_hv_mvar: third(r.q_hv_mvar),
            p_b_hv_mw: third(r.p_hv_mw),
            q_b_hv_mvar: third(r.q_hv_mvar),
            p_c_hv_mw: third(r.p_hv_mw),
            q_c_hv_mvar: third(r.q_hv_mvar),
            p_a_lv_mw: third(r.p_lv_mw),
            q_a_lv_mvar: third(r.q_lv_mvar),
            p_b_lv_mw: third(r.p_lv_mw),
            q_b_lv_mvar: third(r.q_lv_mvar),
            p_c_lv_mw: third(r.p_lv_mw),
            q_c_lv_mvar: third(r.q_lv_mvar),
            p_a_l_mw: third(r.pl_mw),
            q_a_l_mvar: third(r.ql_mvar),
            p_b_l_mw: third(r.pl_mw),
            q_b_l_mvar: third(r.ql_mvar),
            p_c_l_mw: third(r.pl_mw),
            q_c_l_mvar: third(r.ql_mvar),
            i_a_hv_ka: r.i_hv_ka,
            i_a_lv_ka: r.i_lv_ka,
            i_b_hv_ka: r.i_hv_ka,
            i_b_lv_ka: r.i_lv_ka,
            i_c_hv_ka: r.i_hv_ka,
            i_c_lv_ka: r.i_lv_ka,
            loading_a_percent: r.loading_percent,
            loading_b_percent: r.loading_percent,
            loading_c_percent: r.loading_percent,
            loading_percent: r.loading_percent,
        }
    }
}

/// One named row of a result table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub name: String,
    pub values: Vec<f64>,
}

/// Results of one element kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub columns: &'static [&'static str],
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new<'a, R: ResultRecord>(
        names: impl IntoIterator<Item = &'a Option<String>>,
        records: &[R],
    ) -> Self {
        let rows = names
            .into_iter()
            .zip(records)
            .map(|(name, record)| ResultRow {
                name: name.clone().unwrap_or_default(),
                values: record.values(),
            })
            .collect();
        ResultTable {
            columns: R::COLUMNS,
            rows,
        }
    }

    /// Row whose name equals `name` exactly.
    pub fn find(&self, name: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|row| row.name == name)
    }
}

/// Result tables of one solve, keyed by element kind.
#[derive(Debug, Default, Clone)]
pub struct ResultTables(HashMap<ElementKind, ResultTable>);

impl ResultTables {
    pub fn insert(&mut self, kind: ElementKind, table: ResultTable) {
        self.0.insert(kind, table);
    }

    pub fn table(&self, kind: ElementKind) -> Option<&ResultTable> {
        self.0.get(&kind)
    }

    pub fn find(&self, kind: ElementKind, name: &str) -> Option<&ResultRow> {
        self.table(kind).and_then(|t| t.find(name))
    }
}

/// Per-unit solution together with the network it was computed on.
struct Solved<'a> {
    model: &'a GridModel,
    net: &'a PFNetwork,
    v: &'a DVector<Complex64>,
    /// Net complex power injected at each node, in MVA.
    s_node: DVector<Complex64>,
}

/// Complex flows at both ends of a branch.
struct BranchFlow {
    s_from: Complex64,
    s_to: Complex64,
    i_from_ka: f64,
    i_to_ka: f64,
    v_from: Complex64,
    v_to: Complex64,
}

impl<'a> Solved<'a> {
    fn new(model: &'a GridModel, net: &'a PFNetwork, v: &'a DVector<Complex64>) -> Self {
        let i_bus = bus_currents(&net.create_y_bus(), v);
        let s_node = v.component_mul(&i_bus.conjugate()) * Complex64::new(net.s_base, 0.0);
        Solved {
            model,
            net,
            v,
            s_node,
        }
    }

    /// Node of a bus that takes part in the solve.
    fn energised(&self, bus: usize) -> Option<usize> {
        self.net.node_of_bus[bus].filter(|&n| self.net.node_type[n] != NodeType::Isolated)
    }

    fn vm(&self, node: usize) -> f64 {
        self.v[node].norm()
    }

    fn va_degree(&self, node: usize) -> f64 {
        self.v[node].arg().to_degrees()
    }

    /// Power the fixed injections of a node draw at the solved voltage, in MVA.
    fn scheduled(&self, node: usize) -> Complex64 {
        self.net.injections[node].at(self.vm(node)) * self.net.s_base
    }

    fn i_base_ka(&self, node: usize) -> f64 {
        self.net.s_base / (3f64.sqrt() * self.net.node_vn_kv[node])
    }

    fn flow(&self, br: &AdmittanceBranch) -> BranchFlow {
        let (f, t) = (br.port.from_node(), br.port.to_node());
        let (v_from, v_to) = (self.v[f], self.v[t]);
        let (i_f, i_t) = br.currents(v_from, v_to);
        BranchFlow {
            s_from: v_from * i_f.conj() * self.net.s_base,
            s_to: v_to * i_t.conj() * self.net.s_base,
            i_from_ka: i_f.norm() * self.i_base_ka(f),
            i_to_ka: i_t.norm() * self.i_base_ka(t),
            v_from,
            v_to,
        }
    }

    fn loads(&self) -> Vec<LoadResult> {
        self.model
            .load
            .iter()
            .map(|load| match self.energised(load.bus) {
                Some(n) if load.in_service => {
                    let vm = self.vm(n);
                    let z = load.const_z_percent * 0.01;
                    let i = load.const_i_percent * 0.01;
                    let s = Complex64::new(load.p_mw, load.q_mvar)
                        * load.scaling
                        * (1.0 - z - i + i * vm + z * vm * vm);
                    LoadResult {
                        p_mw: s.re,
                        q_mvar: s.im,
                    }
                }
                _ => LoadResult::default(),
            })
            .collect()
    }

    fn storages(&self) -> Vec<StorageResult> {
        self.model
            .storage
            .iter()
            .map(|storage| match self.energised(storage.bus) {
                Some(_) if storage.in_service => StorageResult {
                    p_mw: storage.p_mw * storage.scaling,
                    q_mvar: storage.q_mvar * storage.scaling,
                },
                _ => StorageResult::default(),
            })
            .collect()
    }

    /// Splits the slack power of every slack node over its external grids
    /// and slack generators by `slack_weight`, equally if all weights are zero.
    fn slack_sources(&self) -> (Vec<ExtGridResult>, Vec<Option<Complex64>>) {
        let n = self.net.n_nodes();
        let mut weight = vec![0.0; n];
        let mut count = vec![0usize; n];
        let mut slack_gen_p = vec![0.0; n];
        let active_grids = || {
            self.model
                .ext_grid
                .iter()
                .map(move |x| (x.in_service.then(|| self.energised(x.bus)).flatten(), x))
        };
        let active_slack_gens = || {
            self.model.gen_.iter().map(move |x| {
                let node = (x.in_service && x.slack)
                    .then(|| self.energised(x.bus))
                    .flatten();
                (node, x)
            })
        };
        for (node, grid) in active_grids() {
            if let Some(node) = node {
                weight[node] += grid.slack_weight;
                count[node] += 1;
            }
        }
        for (node, generator) in active_slack_gens() {
            if let Some(node) = node {
                weight[node] += generator.slack_weight;
                count[node] += 1;
                slack_gen_p[node] += generator.p_mw * generator.scaling;
            }
        }
        let share = |node: usize, w: f64| {
            let total = self.s_node[node] - self.scheduled(node) + slack_gen_p[node];
            let fraction = if weight[node] > 0.0 {
                w / weight[node]
            } else {
                1.0 / count[node] as f64
            };
            total * fraction
        };

        let grids = active_grids()
            .map(|(node, grid)| match node {
                Some(node) => {
                    let s = share(node, grid.slack_weight);
                    ExtGridResult {
                        p_mw: s.re,
                        q_mvar: s.im,
                    }
                }
                None => ExtGridResult::default(),
            })
            .collect();
        let gens = active_slack_gens()
            .map(|(node, generator)| node.map(|node| share(node, generator.slack_weight)))
            .collect();
        (grids, gens)
    }

    fn gens(&self, slack: &[Option<Complex64>]) -> Vec<GenResult> {
        let n = self.net.n_nodes();
        let mut pv_count = vec![0usize; n];
        for generator in self.model.gen_.iter().filter(|x| x.in_service) {
            if let Some(node) = self.energised(generator.bus) {
                if self.net.node_type[node] == NodeType::PV {
                    pv_count[node] += 1;
                }
            }
        }
        self.model
            .gen_
            .iter()
            .zip(slack)
            .map(|(generator, slack)| {
                let node = match self.energised(generator.bus) {
                    Some(node) if generator.in_service => node,
                    _ => return GenResult::default(),
                };
                let s = match slack {
                    Some(s) => *s,
                    None if self.net.node_type[node] == NodeType::PV => {
                        let q = (self.s_node[node] - self.scheduled(node)).im;
                        Complex64::new(generator.p_mw * generator.scaling, q / pv_count[node] as f64)
                    }
                    None => Complex64::new(generator.p_mw * generator.scaling, 0.0),
                };
                GenResult {
                    p_mw: s.re,
                    q_mvar: s.im,
                    va_degree: self.va_degree(node),
                    vm_pu: self.vm(node),
                }
            })
            .collect()
    }

    fn buses(
        &self,
        loads: &[LoadResult],
        storages: &[StorageResult],
        gens: &[GenResult],
        grids: &[ExtGridResult],
    ) -> Vec<BusResult> {
        let model = self.model;
        let mut s_bus = vec![Complex64::default(); model.bus.len()];
        for (load, r) in model.load.iter().zip(loads) {
            s_bus[load.bus] += Complex64::new(r.p_mw, r.q_mvar);
        }
        for (storage, r) in model.storage.iter().zip(storages) {
            s_bus[storage.bus] += Complex64::new(r.p_mw, r.q_mvar);
        }
        for (generator, r) in model.gen_.iter().zip(gens) {
            s_bus[generator.bus] -= Complex64::new(r.p_mw, r.q_mvar);
        }
        for (grid, r) in model.ext_grid.iter().zip(grids) {
            s_bus[grid.bus] -= Complex64::new(r.p_mw, r.q_mvar);
        }
        (0..model.bus.len())
            .map(|bus| {
                let (vm_pu, va_degree) = match self.energised(bus) {
                    Some(node) => (self.vm(node), self.va_degree(node)),
                    None => (f64::NAN, f64::NAN),
                };
                BusResult {
                    vm_pu,
                    va_degree,
                    p_mw: s_bus[bus].re,
                    q_mvar: s_bus[bus].im,
                }
            })
            .collect()
    }

    fn lines(&self) -> Vec<LineResult> {
        self.model
            .line
            .iter()
            .zip(&self.net.line_branch)
            .map(|(line, br)| {
                let Some(br) = br.map(|b| &self.net.y_br[b]) else {
                    return LineResult::default();
                };
                let flow = self.flow(br);
                let i_ka = flow.i_from_ka.max(flow.i_to_ka);
                let pl = flow.s_from + flow.s_to;
                LineResult {
                    p_from_mw: flow.s_from.re,
                    q_from_mvar: flow.s_from.im,
                    p_to_mw: flow.s_to.re,
                    q_to_mvar: flow.s_to.im,
                    pl_mw: pl.re,
                    ql_mvar: pl.im,
                    i_from_ka: flow.i_from_ka,
                    i_to_ka: flow.i_to_ka,
                    i_ka,
                    vm_from_pu: flow.v_from.norm(),
                    va_from_degree: flow.v_from.arg().to_degrees(),
                    vm_to_pu: flow.v_to.norm(),
                    va_to_degree: flow.v_to.arg().to_degrees(),
                    loading_percent: i_ka / (line.max_i_ka * line.df * line.parallel as f64)
                        * 100.0,
                }
            })
            .collect()
    }

    fn trafos(&self) -> Vec<TrafoResult> {
        self.model
            .trafo
            .iter()
            .zip(&self.net.trafo_branch)
            .map(|(trafo, br)| {
                let Some(br) = br.map(|b| &self.net.y_br[b]) else {
                    return TrafoResult::default();
                };
                let flow = self.flow(br);
                let pl = flow.s_from + flow.s_to;
                let vn_hv = self.net.node_vn_kv[br.port.from_node()];
                let vn_lv = self.net.node_vn_kv[br.port.to_node()];
                let s_max = (flow.i_from_ka * vn_hv).max(flow.i_to_ka * vn_lv) * 3f64.sqrt();
                TrafoResult {
                    p_hv_mw: flow.s_from.re,
                    q_hv_mvar: flow.s_from.im,
                    p_lv_mw: flow.s_to.re,
                    q_lv_mvar: flow.s_to.im,
                    pl_mw: pl.re,
                    ql_mvar: pl.im,
                    i_hv_ka: flow.i_from_ka,
                    i_lv_ka: flow.i_to_ka,
                    vm_hv_pu: flow.v_from.norm(),
                    va_hv_degree: flow.v_from.arg().to_degrees(),
                    vm_lv_pu: flow.v_to.norm(),
                    va_lv_degree: flow.v_to.arg().to_degrees(),
                    loading_percent: s_max / (trafo.sn_mva * trafo.parallel as f64 * trafo.df)
                        * 100.0,
                }
            })
            .collect()
    }
}

/// Computes the result tables of a solved network.
///
/// With `three_phase` set, bus, external grid, line and transformer tables
/// are reported per phase.
pub fn extract_results(
    model: &GridModel,
    net: &PFNetwork,
    v: &DVector<Complex64>,
    three_phase: bool,
) -> ResultTables {
    let solved = Solved::new(model, net, v);
    let loads = solved.loads();
    let storages = solved.storages();
    let (grids, slack_gens) = solved.slack_sources();
    let gens = solved.gens(&slack_gens);
    let buses = solved.buses(&loads, &storages, &gens, &grids);
    let lines = solved.lines();
    let trafos = solved.trafos();

    if enabled!(Level::DEBUG) {
        print_res_bus(model, &buses);
        print_res_line(model, &lines);
    }

    let names = |kind: ElementKind| -> Vec<&Option<String>> {
        match kind {
            ElementKind::Bus => model.bus.iter().map(|x| &x.name).collect(),
            ElementKind::Load => model.load.iter().map(|x| &x.name).collect(),
            ElementKind::Gen => model.gen_.iter().map(|x| &x.name).collect(),
            ElementKind::ExtGrid => model.ext_grid.iter().map(|x| &x.name).collect(),
            ElementKind::Line => model.line.iter().map(|x| &x.name).collect(),
            ElementKind::Trafo => model.trafo.iter().map(|x| &x.name).collect(),
            ElementKind::Storage => model.storage.iter().map(|x| &x.name).collect(),
            ElementKind::Switch => model.switch.iter().map(|x| &x.name).collect(),
        }
    };

    let mut tables = ResultTables::default();
    tables.insert(ElementKind::Load, ResultTable::new(names(ElementKind::Load), &loads));
    tables.insert(
        ElementKind::Storage,
        ResultTable::new(names(ElementKind::Storage), &storages),
    );
    tables.insert(ElementKind::Gen, ResultTable::new(names(ElementKind::Gen), &gens));
    if three_phase {
        let per_phase = |rows: &[BusResult]| rows.iter().map(BusResult3ph::from).collect::<Vec<_>>();
        tables.insert(
            ElementKind::Bus,
            ResultTable::new(names(ElementKind::Bus), &per_phase(&buses)),
        );
        let grids: Vec<ExtGridResult3ph> = grids.iter().map(Into::into).collect();
        let lines: Vec<LineResult3ph> = lines.iter().map(Into::into).collect();
        let trafos: Vec<TrafoResult3ph> = trafos.iter().map(Into::into).collect();
        tables.insert(ElementKind::ExtGrid, ResultTable::new(names(ElementKind::ExtGrid), &grids));
        tables.insert(ElementKind::Line, ResultTable::new(names(ElementKind::Line), &lines));
        tables.insert(ElementKind::Trafo, ResultTable::new(names(ElementKind::Trafo), &trafos));
    } else {
        tables.insert(ElementKind::Bus, ResultTable::new(names(ElementKind::Bus), &buses));
        tables.insert(ElementKind::ExtGrid, ResultTable::new(names(ElementKind::ExtGrid), &grids));
        tables.insert(ElementKind::Line, ResultTable::new(names(ElementKind::Line), &lines));
        tables.insert(ElementKind::Trafo, ResultTable::new(names(ElementKind::Trafo), &trafos));
    }
    tables
}

fn label(name: &Option<String>) -> String {
    name.clone().unwrap_or_default()
}

/// Logs the bus results as a markdown table.
fn print_res_bus(model: &GridModel, buses: &[BusResult]) {
    let rows = model.bus.iter().zip(buses).map(|(bus, r)| BusResTable {
        Bus: label(&bus.name),
        Vm: FloatWrapper::new(r.vm_pu, 3),
        Va: FloatWrapper::new(r.va_degree, 3),
        P_mw: FloatWrapper::new(r.p_mw, 5),
        Q_mvar: FloatWrapper::new(r.q_mvar, 5),
    });
    let table = Table::new(rows).with(Style::markdown()).to_string();
    debug!("bus results\n{table}");
}

/// Logs the line results as a markdown table.
fn print_res_line(model: &GridModel, lines: &[LineResult]) {
    if lines.is_empty() {
        return;
    }
    let rows = model.line.iter().zip(lines).map(|(line, r)| LineResTable {
        line: label(&line.name),
        p_from_mw: FloatWrapper::new(r.p_from_mw, 3),
        q_from_mvar: FloatWrapper::new(r.q_from_mvar, 3),
        p_to_mw: FloatWrapper::new(r.p_to_mw, 3),
        q_to_mvar: FloatWrapper::new(r.q_to_mvar, 3),
        pl_mw: FloatWrapper::new(r.pl_mw, 3),
        i_ka: FloatWrapper::new(r.i_ka, 3),
        loading_percent: FloatWrapper::new(r.loading_percent, 1),
    });
    let table = Table::new(rows).with(Style::markdown()).to_string();
    debug!("line results\n{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::solver::DefaultSolver;
    use crate::basic::system::tests::model_of;
    use serde_json::json;

    fn solve(model: &GridModel, three_phase: bool) -> ResultTables {
        let net = PFNetwork::from_model(model).unwrap();
        let (v, _) = net
            .run_pf(&mut DefaultSolver::default(), Some(10), Some(1e-10))
            .unwrap();
        extract_results(model, &net, &v, three_phase)
    }

    fn value(tables: &ResultTables, kind: ElementKind, name: &str, column: &str) -> f64 {
        let table = tables.table(kind).unwrap();
        let col = table.columns.iter().position(|c| *c == column).unwrap();
        table.find(name).unwrap().values[col]
    }

    fn feeder() -> GridModel {
        model_of(json!({
            "b0": {"etype": "bus", "vn_kv": 20.0},
            "b1": {"etype": "bus", "vn_kv": 20.0},
            "grid": {"etype": "ext_grid", "bus": "b0"},
            "line": {"etype": "line", "from_bus": "b0", "to_bus": "b1", "length_km": 5.0,
                     "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV"},
            "load": {"etype": "load", "bus": "b1", "p_mw": 2.0, "q_mvar": 0.5},
        }))
    }

    #[test]
    fn power_balances_over_feeder() {
        let tables = solve(&feeder(), false);
        let p_grid = value(&tables, ElementKind::ExtGrid, "grid", "p_mw");
        let pl = value(&tables, ElementKind::Line, "line", "pl_mw");
        assert!((p_grid - 2.0 - pl).abs() < 1e-6);
        assert!(pl > 0.0);
        assert!(value(&tables, ElementKind::Bus, "b1", "vm_pu") < 1.0);
        assert!((value(&tables, ElementKind::Bus, "b1", "p_mw") - 2.0).abs() < 1e-9);
        assert!((value(&tables, ElementKind::Bus, "b0", "p_mw") + p_grid).abs() < 1e-9);
        assert_eq!(value(&tables, ElementKind::Load, "load", "p_mw"), 2.0);
    }

    #[test]
    fn line_current_matches_transferred_power() {
        let tables = solve(&feeder(), false);
        let p = value(&tables, ElementKind::Line, "line", "p_from_mw");
        let q = value(&tables, ElementKind::Line, "line", "q_from_mvar");
        let vm = value(&tables, ElementKind::Line, "line", "vm_from_pu");
        let i = value(&tables, ElementKind::Line, "line", "i_from_ka");
        let expected = (p * p + q * q).sqrt() / (3f64.sqrt() * 20.0 * vm);
        assert!((i - expected).abs() < 1e-9);
        let loading = value(&tables, ElementKind::Line, "line", "loading_percent");
        let i_ka = value(&tables, ElementKind::Line, "line", "i_ka");
        assert!((loading - i_ka / 0.252 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn three_phase_tables_split_per_phase() {
        let single = solve(&feeder(), false);
        let tables = solve(&feeder(), true);
        let vm = value(&single, ElementKind::Bus, "b1", "vm_pu");
        let va = value(&single, ElementKind::Bus, "b1", "va_degree");
        assert!((value(&tables, ElementKind::Bus, "b1", "vm_b_pu") - vm).abs() < 1e-12);
        assert!((value(&tables, ElementKind::Bus, "b1", "va_b_degree") - (va - 120.0)).abs() < 1e-9);
        let p = value(&single, ElementKind::ExtGrid, "grid", "p_mw");
        assert!((value(&tables, ElementKind::ExtGrid, "grid", "p_c_mw") - p / 3.0).abs() < 1e-12);
        assert!(tables.table(ElementKind::Line).unwrap().columns.contains(&"i_n_ka"));
    }

    #[test]
    fn pv_generator_supplies_reactive_power() {
        let model = model_of(json!({
            "b0": {"etype": "bus", "vn_kv": 20.0},
            "b1": {"etype": "bus", "vn_kv": 20.0},
            "grid": {"etype": "ext_grid", "bus": "b0"},
            "line": {"etype": "line", "from_bus": "b0", "to_bus": "b1", "length_km": 5.0,
                     "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV"},
            "load": {"etype": "load", "bus": "b1", "p_mw": 2.0, "q_mvar": 1.0},
            "gen": {"etype": "gen", "bus": "b1", "p_mw": 1.0, "vm_pu": 1.0},
        }));
        let tables = solve(&model, false);
        assert!((value(&tables, ElementKind::Bus, "b1", "vm_pu") - 1.0).abs() < 1e-9);
        assert_eq!(value(&tables, ElementKind::Gen, "gen", "p_mw"), 1.0);
        // the generator covers the load's reactive demand and then some
        assert!(value(&tables, ElementKind::Gen, "gen", "q_mvar") > 0.9);
        let q_bus = value(&tables, ElementKind::Bus, "b1", "q_mvar");
        let q_gen = value(&tables, ElementKind::Gen, "gen", "q_mvar");
        assert!((q_bus - (1.0 - q_gen)).abs() < 1e-9);
    }

    #[test]
    fn phase_angles_wrap() {
        assert_eq!(phase_angles(0.0), [0.0, -120.0, 120.0]);
        let [_, b, c] = phase_angles(-150.0);
        assert!((b - 90.0).abs() < 1e-12);
        assert!((c + 30.0).abs() < 1e-12);
    }
}
