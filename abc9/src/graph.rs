use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use boxsplice_netlist::{CellType, Design, Module, PortDirection, SigBit, SigMap};

use crate::catalog::is_box_type;

/// Cell dependency graph derived from which cells drive and which cells use each bit.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: IndexMap<String, NodeIndex>,
    drivers: BTreeMap<SigBit, BTreeSet<NodeIndex>>,
    users: BTreeMap<SigBit, BTreeSet<NodeIndex>>,
}

impl DependencyGraph {
    pub fn new() -> DependencyGraph {
        DependencyGraph::default()
    }

    pub fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&node) = self.nodes.get(name) {
            return node;
        }
        let node = self.graph.add_node(name.to_owned());
        self.nodes.insert(name.to_owned(), node);
        node
    }

    pub fn add_driver(&mut self, cell: &str, bit: SigBit) {
        let node = self.node(cell);
        self.drivers.entry(bit).or_default().insert(node);
    }

    pub fn add_user(&mut self, cell: &str, bit: SigBit) {
        let node = self.node(cell);
        self.users.entry(bit).or_default().insert(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn connect(&mut self) {
        for (bit, users) in &self.users {
            let Some(drivers) = self.drivers.get(bit) else { continue };
            for &driver in drivers {
                for &user in users {
                    self.graph.update_edge(driver, user, ());
                }
            }
        }
    }

    /// Cell names in dependency order, or every loop if there is one.
    pub fn sort(mut self) -> Result<Vec<String>, Vec<Vec<String>>> {
        self.connect();
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|node| self.graph[node].clone()).collect()),
            Err(_) => Err(self.loops()),
        }
    }

    fn loops(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1 || self.graph.contains_edge(component[0], component[0]))
            .map(|component| component.into_iter().map(|node| self.graph[node].clone()).collect())
            .collect()
    }
}

/// Builds the dependency graph the mapper boundary is extracted from.
///
/// Sequential placeholders and cells marked to keep are not part of it, and neither are
/// instances of modules that are not boxes. Register macros are included only if `dff` is set,
/// and never act as drivers. Bits of wires cut by SCC marking have no driver in the graph.
pub(crate) fn boundary_graph(design: &Design, module: &Module, sigmap: &SigMap, dff: bool) -> (DependencyGraph, bool) {
    let cut_bits: BTreeSet<SigBit> = module
        .wires()
        .filter(|(_, wire)| wire.attrs.is_scc_cut())
        .flat_map(|(id, _)| module.sig(id).iter().map(|bit| sigmap.bit(bit)).collect::<Vec<_>>())
        .collect();

    let mut graph = DependencyGraph::new();
    let mut has_boxes = false;
    for (name, cell) in module.cells() {
        if cell.type_ == CellType::Ff || cell.attrs.keep {
            continue;
        }
        let instance = design.instantiated(cell);
        let flop = instance.is_some_and(|module| module.attrs.flop);
        if flop && !dff {
            continue;
        }
        if cell.type_ == CellType::Delay || instance.is_some_and(is_box_type) {
            has_boxes = true;
        } else if !cell.type_.is_builtin() {
            continue;
        }
        graph.node(name);
        for (port, sig) in &cell.connections {
            match design.port_direction(cell, port) {
                Some(PortDirection::Input) => {
                    for bit in sig.iter() {
                        graph.add_user(name, sigmap.bit(bit));
                    }
                }
                Some(PortDirection::Output) if !flop => {
                    for bit in sig.iter().map(|bit| sigmap.bit(bit)) {
                        if !bit.is_const() && !cut_bits.contains(&bit) {
                            graph.add_driver(name, bit);
                        }
                    }
                }
                _ => (),
            }
        }
    }
    (graph, has_boxes)
}

/// Returns every combinational loop through the cells of `module` that boundary extraction
/// would see.
pub fn find_loops(design: &Design, module: &Module) -> Vec<Vec<String>> {
    let sigmap = SigMap::new(module);
    let (graph, _) = boundary_graph(design, module, &sigmap, true);
    graph.sort().err().unwrap_or_default()
}
