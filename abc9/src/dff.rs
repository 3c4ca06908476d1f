use std::collections::BTreeMap;

use tracing::debug;

use boxsplice_netlist::{id, Cell, CellType, Design, Module, SigBit, SigMap, SigSpec, State};

use crate::error::Error;
use crate::session::{holes_name, HolesInfo, Session};

/// Clock and initial value wires accompanying a sequential placeholder.
struct FlopWires {
    clock: SigSpec,
    init: SigSpec,
}

impl FlopWires {
    fn find(module: &Module, cell: &str) -> Result<FlopWires, Error> {
        let wire = |suffix: &'static str| {
            module.wire_id(&format!("{cell}.{suffix}")).map(|id| module.sig(id)).ok_or_else(|| {
                Error::MissingFlopWire { module: module.name.clone(), cell: cell.to_owned(), suffix }
            })
        };
        Ok(FlopWires { clock: wire("clock")?, init: wire("init")? })
    }
}

/// Assigns clock domains and initial values to the sequential placeholders of a module.
fn assign_domains(module: &mut Module) -> Result<(), Error> {
    let sigmap = SigMap::new(module);
    let mut domains: BTreeMap<SigSpec, i64> = BTreeMap::new();
    let flops =
        module.cells().filter(|(_, cell)| cell.type_ == CellType::Ff).map(|(name, _)| name.to_owned()).collect::<Vec<_>>();
    for name in flops {
        let wires = FlopWires::find(module, &name)?;
        let next = domains.len() as i64 + 1;
        let mergeability = *domains.entry(sigmap.sig(&wires.clock)).or_insert(next);

        let module_name = module.name.clone();
        let init = sigmap.sig(&wires.init);
        let Some(cell) = module.cell_mut(&name) else { continue };
        cell.attrs.mergeability = Some(mergeability);
        let init = match init.as_const() {
            Some(init) if init.len() == 1 => init,
            _ => return Err(Error::NonConstantInit { module: module_name, cell: name }),
        };
        if init[0] == State::One {
            return Err(Error::UnsupportedInit { module: module_name, cell: name });
        }
        debug!("flop {name} in clock domain {mergeability}");
        cell.attrs.init = Some(init);
    }
    Ok(())
}

/// Replaces every flip-flop of a holes network with its next-state logic. The flip-flop output
/// is driven by the register feedback input instead, and whatever read the output as the box
/// output reads the next state instead.
fn expose_next_state(holes: &mut Module, info: &HolesInfo) -> Result<(), Error> {
    let sigmap = SigMap::new(holes);
    let mut replace: BTreeMap<SigBit, SigBit> = BTreeMap::new();
    let flops = holes
        .cells()
        .filter_map(|(name, cell)| match cell.type_ {
            CellType::Dff(kind) => Some((name.to_owned(), kind)),
            _ => None,
        })
        .collect::<Vec<_>>();
    let module_name = holes.name.clone();
    for (name, kind) in flops {
        let malformed =
            |port: &str| Error::MalformedCell { module: module_name.clone(), cell: name.clone(), port: port.to_owned() };
        let Some(cell) = holes.remove_cell(&name) else { continue };
        let d = cell.port_bit(id::D).ok_or_else(|| malformed(id::D))?;
        let q = cell.port_bit(id::Q).ok_or_else(|| malformed(id::Q))?;
        let next = match kind.reset() {
            None => d,
            Some((active_high, value)) => {
                let reset = cell.port_bit(id::R).ok_or_else(|| malformed(id::R))?;
                let mux_name = holes.fresh_name("abc9_dff_reset");
                let y = holes.add_fresh_bit("abc9_dff_reset");
                let (a, b) = if active_high { (d, SigBit::Const(value)) } else { (SigBit::Const(value), d) };
                holes.add_cell(mux_name, Cell::mux(a, b, reset, y))?;
                y
            }
        };
        let feedback = *info
            .feedback
            .get(&name)
            .ok_or_else(|| Error::MissingFeedback { module: module_name.clone(), cell: name.clone() })?;
        replace.insert(sigmap.bit(q), next);
        holes.connect(q, feedback);
    }

    for (_, rhs) in holes.connections.iter_mut() {
        for bit in rhs.iter_mut() {
            if let Some(&next) = replace.get(&sigmap.bit(*bit)) {
                *bit = next;
            }
        }
    }
    Ok(())
}

/// Prepares the registers of a module for mapping: sequential placeholders are assigned a
/// clock domain and initial value, and the holes network built for the module, if any, has its
/// flip-flops replaced by their next-state logic.
pub fn prep_dff(design: &mut Design, session: &Session, module_name: &str) -> Result<(), Error> {
    let Some(module) = design.module_mut(module_name) else { return Ok(()) };
    assign_domains(module)?;

    let holes_name = holes_name(module_name);
    let Some(holes) = design.module_mut(&holes_name) else { return Ok(()) };
    let info = match session.holes.get(&holes_name) {
        Some(info) => info.clone(),
        None => HolesInfo::recover(holes)?,
    };
    expose_next_state(holes, &info)
}
