use std::collections::BTreeSet;

use tracing::debug;

use boxsplice_netlist::{Design, PortDirection};

/// Breaks every marked strongly connected component: the outputs of the first cell carrying
/// each SCC id are turned into a kept boundary wire, which the mapper sees as an output and an
/// input. SCC ids are removed from every cell.
pub fn mark_scc(design: &mut Design, module_name: &str) {
    let Some(module) = design.module(module_name) else { return };

    let mut seen = BTreeSet::new();
    let mut cuts = vec![];
    for (name, cell) in module.cells() {
        let Some(scc_id) = cell.attrs.scc_id else { continue };
        if !seen.insert(scc_id) {
            continue;
        }
        debug!("cutting SCC {scc_id} at {name}");
        for (port, sig) in &cell.connections {
            if sig.is_fully_const() || design.port_direction(cell, port) != Some(PortDirection::Output) {
                continue;
            }
            cuts.extend(sig.iter().filter_map(|bit| bit.wire()).map(|wire| (wire, scc_id)));
        }
    }

    let Some(module) = design.module_mut(module_name) else { return };
    for (_, cell) in module.cells_mut() {
        cell.attrs.scc_id = None;
    }
    for (wire, scc_id) in cuts {
        let attrs = &mut module.wire_mut(wire).attrs;
        attrs.keep = true;
        attrs.scc_id = Some(scc_id);
    }
    module.fixup_ports();
}
