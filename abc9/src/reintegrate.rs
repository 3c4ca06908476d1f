use std::collections::BTreeMap;

use tracing::{debug, info};

use boxsplice_netlist::{
    id, Cell, CellType, Const, Design, Module, ParamValue, PortDirection, SigBit, SigSpec, Wire, WireId,
};

use crate::error::Error;
use crate::graph::DependencyGraph;
use crate::lut::{invert_input, invert_output};
use crate::session::{holes_name, mapped_name, Session, DELAY_BASE_ID};

fn remap_name(epoch: usize, name: &str) -> String {
    format!("$abc${epoch}${}", name.get(1..).unwrap_or_default())
}

/// Correspondence between the wires of the mapped module and the wires created for them in the
/// module being reintegrated into.
struct Remap {
    epoch: usize,
    wires: Vec<WireId>,
}

impl Remap {
    fn name(&self, name: &str) -> String {
        remap_name(self.epoch, name)
    }

    fn bit(&self, bit: SigBit) -> SigBit {
        match bit {
            SigBit::Wire(wire, offset) => SigBit::Wire(self.wires[wire.index()], offset),
            bit => bit,
        }
    }

    fn sig(&self, sig: &SigSpec) -> SigSpec {
        sig.map(|bit| self.bit(bit))
    }
}

/// How a box instance referenced by the mapper is put back.
enum BoxPlan {
    /// Delay placeholder; replaced by a connection.
    Delay { input: SigBit, output: SigBit },
    Instance {
        existing: Cell,
        flop: bool,
        /// Name, width, and direction (input, output) of every port, in box port order.
        ports: Vec<(String, usize, bool, bool)>,
        inputs: SigSpec,
        outputs: SigSpec,
    },
}

/// Resolves every box the mapper references to the instance it stands for.
fn plan_boxes(
    design: &mut Design,
    session: &Session,
    module_name: &str,
    mapped: &Module,
) -> Result<BTreeMap<String, BoxPlan>, Error> {
    let mut plans = BTreeMap::new();
    for (name, mapped_cell) in mapped.cells() {
        if matches!(mapped_cell.type_, CellType::Not | CellType::Lut | CellType::Ff) {
            continue;
        }
        let unknown = || Error::UnknownBox { module: module_name.to_owned(), cell: name.to_owned() };
        let malformed =
            |port: &str| Error::MalformedCell { module: mapped.name.clone(), cell: name.to_owned(), port: port.to_owned() };
        let existing = design.module(module_name).and_then(|module| module.cell(name)).cloned().ok_or_else(unknown)?;
        let inputs = mapped_cell.port(id::BOX_I).cloned().ok_or_else(|| malformed(id::BOX_I))?;
        let outputs = mapped_cell.port(id::BOX_O).cloned().ok_or_else(|| malformed(id::BOX_O))?;

        let (box_id, plan) = match &existing.type_ {
            CellType::Delay => {
                let delay = existing.param(id::DELAY).and_then(ParamValue::as_int);
                let (Some(input), Some(output @ SigBit::Wire(..))) = (inputs.as_bit(), outputs.as_bit()) else {
                    return Err(malformed(id::BOX_O));
                };
                (delay.map(|delay| DELAY_BASE_ID + delay), BoxPlan::Delay { input, output })
            }
            CellType::Instance(base) => {
                let derived = design
                    .derive(base, &existing.parameters)
                    .ok_or_else(|| Error::MissingBoxPorts { box_type: base.clone() })?;
                let box_module =
                    design.module(&derived).ok_or_else(|| Error::MissingBoxPorts { box_type: derived.clone() })?;
                let ports = session
                    .catalog
                    .require(&existing.type_)?
                    .into_iter()
                    .map(|port| {
                        let wire = box_module
                            .wire_by_name(port)
                            .ok_or_else(|| Error::UnknownWire { module: derived.clone(), wire: port.to_owned() })?;
                        Ok((port.to_owned(), wire.width, wire.port_input, wire.port_output))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                let flop = box_module.attrs.flop;
                // Register macros take their feedback as one extra input bit, after all ports.
                let input_width =
                    ports.iter().filter(|port| port.2).map(|port| port.1).sum::<usize>() + usize::from(flop);
                let output_width = ports.iter().filter(|port| port.3).map(|port| port.1).sum::<usize>();
                for (port, width, sig) in [(id::BOX_I, input_width, &inputs), (id::BOX_O, output_width, &outputs)] {
                    if sig.len() != width {
                        return Err(Error::BoxWidthMismatch {
                            module: mapped.name.clone(),
                            cell: name.to_owned(),
                            port: port.to_owned(),
                            width,
                            mapped: sig.len(),
                        });
                    }
                }
                (box_module.attrs.box_id, BoxPlan::Instance { existing: existing.clone(), flop, ports, inputs, outputs })
            }
            _ => return Err(unknown()),
        };
        if let Some(box_id) = box_id {
            let expected = format!("$__boxid{box_id}");
            let found = mapped_cell.type_.name();
            if found != expected {
                return Err(Error::BoxIdMismatch { cell: name.to_owned(), expected, found: found.into_owned() });
            }
        }
        plans.insert(name.to_owned(), plan);
    }
    Ok(plans)
}

/// Dependency graph of the mapped module. Register macros and sequential placeholders do not
/// drive anything, and neither do wires that are both inputs and outputs.
fn mapped_graph(mapped: &Module, plans: &BTreeMap<String, BoxPlan>) -> DependencyGraph {
    let drives = |bit: SigBit| match bit {
        SigBit::Wire(wire, _) => {
            let wire = mapped.wire(wire);
            !(wire.port_input && wire.port_output)
        }
        SigBit::Const(_) => false,
    };
    let mut graph = DependencyGraph::new();
    for (name, cell) in mapped.cells() {
        graph.node(name);
        match plans.get(name) {
            Some(BoxPlan::Instance { flop: false, inputs, outputs, .. }) => {
                for bit in inputs.iter() {
                    graph.add_user(name, bit);
                }
                for bit in outputs.iter().filter(|&bit| drives(bit)) {
                    graph.add_driver(name, bit);
                }
            }
            Some(_) => (),
            None => {
                for (port, sig) in &cell.connections {
                    match cell.type_.builtin_direction(port) {
                        Some(PortDirection::Input) => {
                            for bit in sig.iter() {
                                graph.add_user(name, bit);
                            }
                        }
                        Some(PortDirection::Output) if cell.type_ != CellType::Ff => {
                            for bit in sig.iter().filter(|&bit| drives(bit)) {
                                graph.add_driver(name, bit);
                            }
                        }
                        _ => (),
                    }
                }
            }
        }
    }
    graph
}

/// Replaces the logic of a module with the result of the mapper, `<module>$abc9`.
///
/// Every wire of the mapped module is recreated in the module under a name unique to this
/// reintegration, `$abc$<epoch>$<name>`. Gates, lookup tables, and sequential placeholders of
/// the module are removed (unless kept), and the cells of the mapped module take their place.
/// Boxes referenced by the mapper replace the box instances of the same name, with their
/// flattened `i`/`o` buses split back into ports; delay placeholders become connections. The
/// ports of the mapped module are then connected to the module wires of the same name.
///
/// Inverters returned by the mapper are absorbed into lookup tables: into the tables reading
/// the inverted signal if they all are lookup tables, and otherwise into a complemented copy of
/// the table driving it. The mapped module and the holes network are removed afterwards.
///
/// All checks happen before the module is changed; on error, the module is left untouched.
pub fn reintegrate(design: &mut Design, session: &mut Session, module_name: &str) -> Result<(), Error> {
    let mapped_name = mapped_name(module_name);
    let mapped = design
        .module(&mapped_name)
        .cloned()
        .ok_or_else(|| Error::MissingMappedModule { module: module_name.to_owned() })?;
    if design.module(module_name).is_none() {
        return Ok(());
    }

    session.catalog.populate(design)?;
    let plans = plan_boxes(design, session, module_name, &mapped)?;
    let order = mapped_graph(&mapped, &plans)
        .sort()
        .map_err(|cells| Error::Loop { module: mapped_name.clone(), cells })?;

    let mut nots: BTreeMap<&str, (SigBit, SigBit)> = BTreeMap::new();
    let mut lut_drivers: BTreeMap<SigBit, (&str, &SigSpec, Const)> = BTreeMap::new();
    for (name, cell) in mapped.cells() {
        let malformed =
            |port: &str| Error::MalformedCell { module: mapped_name.clone(), cell: name.to_owned(), port: port.to_owned() };
        match cell.type_ {
            CellType::Not => {
                let a = cell.port_bit(id::A).ok_or_else(|| malformed(id::A))?;
                let y = cell.port_bit(id::Y).filter(|bit| !bit.is_const()).ok_or_else(|| malformed(id::Y))?;
                nots.insert(name, (a, y));
            }
            CellType::Lut => {
                let inputs = cell.port(id::A).ok_or_else(|| malformed(id::A))?;
                let output = cell.port_bit(id::Y).ok_or_else(|| malformed(id::Y))?;
                let size = u32::try_from(inputs.len()).ok().and_then(|count| 1usize.checked_shl(count));
                let mask = cell.lut_mask().filter(|mask| Some(mask.len()) == size).ok_or_else(|| malformed(id::LUT))?;
                lut_drivers.insert(output, (name, inputs, mask));
            }
            _ => (),
        }
    }

    let Some(module) = design.module(module_name) else { return Ok(()) };
    for &port in &mapped.ports {
        let mapped_wire = mapped.wire(port);
        let wire = module
            .wire_by_name(&mapped_wire.name)
            .ok_or_else(|| Error::UnknownWire { module: module_name.to_owned(), wire: mapped_wire.name.clone() })?;
        if wire.width < mapped_wire.width {
            return Err(Error::WidthMismatch {
                module: module_name.to_owned(),
                wire: wire.name.clone(),
                width: wire.width,
                mapped: mapped_wire.width,
            });
        }
    }
    let epoch = loop {
        let epoch = session.next_epoch();
        let taken = mapped.wires().any(|(_, wire)| module.wire_id(&remap_name(epoch, &wire.name)).is_some())
            || mapped.cells().any(|(name, _)| module.cell(&remap_name(epoch, name)).is_some());
        if !taken {
            break epoch;
        }
    };
    debug!("reintegrating {} into {} with epoch {}", mapped_name, module_name, epoch);

    let Some(module) = design.module_mut(module_name) else { return Ok(()) };
    let remap = Remap {
        epoch,
        wires: mapped
            .wires()
            .map(|(_, wire)| module.add_wire(Wire::new(remap_name(epoch, &wire.name), wire.width)))
            .collect::<Result<_, _>>()?,
    };

    let mut old_boxes = vec![];
    for name in module.cell_names() {
        let Some(cell) = module.cell_mut(&name) else { continue };
        if cell.attrs.keep {
            continue;
        }
        // Any unkept gate or table goes along with the register placeholders, not only the gate
        // types extracted for the mapper. The mapped module replaces all of the module's logic.
        if cell.type_.is_gate() || matches!(cell.type_, CellType::Lut | CellType::Ff) {
            module.remove_cell(&name);
        } else if cell.attrs.box_seq.take().is_some() {
            old_boxes.push(name);
        }
    }

    // Cells reading each (reintegrated) bit, for inverter absorption.
    let mut sinks: BTreeMap<SigBit, Vec<String>> = BTreeMap::new();
    let mut not_drivers: BTreeMap<&str, SigBit> = BTreeMap::new();
    let mut stats: BTreeMap<String, usize> = BTreeMap::new();
    let mut renamed: BTreeMap<String, String> = BTreeMap::new();
    for (name, mapped_cell) in mapped.cells() {
        match &mapped_cell.type_ {
            CellType::Not => {
                let Some(&(a, y)) = nots.get(name) else { continue };
                let a_wire = match a {
                    SigBit::Const(state) => {
                        module.connect(remap.bit(y), SigBit::Const(!state));
                        continue;
                    }
                    SigBit::Wire(wire, _) => mapped.wire(wire),
                };
                if !a_wire.port_input && lut_drivers.contains_key(&a) {
                    not_drivers.insert(name, a);
                    continue;
                }
                let mut lut_name = remap.name(&format!("$lut{name}"));
                if module.cell(&lut_name).is_some() {
                    lut_name = module.fresh_name(&lut_name);
                }
                sinks.entry(remap.bit(a)).or_default().push(lut_name.clone());
                module.add_cell(lut_name, Cell::lut(SigSpec::from(remap.bit(a)), remap.bit(y), Const::lit("01")))?;
                *stats.entry(CellType::Lut.name().into_owned()).or_default() += 1;
            }
            CellType::Lut | CellType::Ff => {
                let mut cell = mapped_cell.clone();
                for sig in cell.connections.values_mut() {
                    *sig = remap.sig(sig);
                }
                let mut new_name = remap.name(name);
                if module.cell(&new_name).is_some() {
                    new_name = module.fresh_name(&new_name);
                }
                for (port, sig) in &cell.connections {
                    if cell.type_.builtin_direction(port) == Some(PortDirection::Input) {
                        for bit in sig.iter() {
                            sinks.entry(bit).or_default().push(new_name.clone());
                        }
                    }
                }
                *stats.entry(cell.type_.name().into_owned()).or_default() += 1;
                module.add_cell(new_name, cell)?;
            }
            _ => match plans.get(name) {
                Some(&BoxPlan::Delay { input, output }) => {
                    debug!("delay placeholder {name} becomes a connection");
                    module.connect(remap.bit(output), remap.bit(input));
                }
                Some(BoxPlan::Instance { existing, flop, ports, inputs, outputs }) => {
                    let mut cell = Cell::new(existing.type_.clone());
                    cell.parameters = existing.parameters.clone();
                    cell.attrs = existing.attrs.clone();
                    cell.attrs.box_seq = None;
                    let (inputs, outputs) = (remap.sig(inputs), remap.sig(outputs));
                    let (mut input_offset, mut output_offset) = (0, 0);
                    for (port, width, input, output) in ports {
                        let mut sig = SigSpec::new();
                        if *input {
                            sig = inputs.extract(input_offset, *width);
                            input_offset += width;
                        }
                        if *output {
                            sig = outputs.extract(output_offset, *width);
                            output_offset += width;
                        }
                        if *input && !flop {
                            for bit in sig.iter() {
                                sinks.entry(bit).or_default().push(name.to_owned());
                            }
                        }
                        cell.set_port(port, sig);
                    }
                    let old_name = remap.name(name);
                    module.rename_cell(name, old_name.clone())?;
                    renamed.insert(name.to_owned(), old_name);
                    module.add_cell(name, cell)?;
                    *stats.entry(existing.type_.name().into_owned()).or_default() += 1;
                }
                None => (),
            },
        }
    }

    for name in old_boxes {
        module.remove_cell(renamed.get(&name).unwrap_or(&name));
    }
    for (lhs, rhs) in &mapped.connections {
        module.connect(remap.sig(lhs), remap.sig(rhs));
    }
    for (cell_type, count) in &stats {
        info!("ABC RESULTS: {:>15} cells: {:>8}", cell_type, count);
    }

    let (mut input_count, mut output_count) = (0, 0);
    for &port in &mapped.ports {
        let mapped_wire = mapped.wire(port);
        let Some(wire) = module.wire_id(&mapped_wire.name) else { continue };
        let attrs = &mut module.wire_mut(wire).attrs;
        if attrs.scc_id.take().is_some() {
            attrs.keep = false;
        }
        let signal = module.sig(wire).extract(0, mapped_wire.width);
        let remapped = SigSpec::from_wire(remap.wires[port.index()], mapped_wire.width);
        if mapped_wire.port_output {
            module.connect(signal, remapped);
            output_count += 1;
        } else if mapped_wire.port_input {
            module.connect(remapped, signal);
            input_count += 1;
        }
    }

    for name in order.iter().rev() {
        let (Some(&a), Some(&(_, y))) = (not_drivers.get(name.as_str()), nots.get(name.as_str())) else { continue };
        let Some((_, driver_inputs, driver_mask)) = lut_drivers.get(&a) else { continue };
        let (a, y) = (remap.bit(a), remap.bit(y));

        let mut readers = sinks.get(&a).cloned().unwrap_or_default();
        readers.sort();
        readers.dedup();
        let only_luts = !readers.is_empty()
            && readers.iter().all(|reader| module.cell(reader).is_some_and(|cell| cell.type_ == CellType::Lut));
        if only_luts {
            for reader in &readers {
                let Some(cell) = module.cell_mut(reader) else { continue };
                let (Some(mut inputs), Some(mut mask)) = (cell.port(id::A).cloned(), cell.lut_mask()) else { continue };
                for index in 0..inputs.len() {
                    if inputs[index] == a {
                        mask = invert_input(&mask, index);
                        inputs[index] = y;
                    }
                }
                cell.set_port(id::A, inputs);
                cell.parameters.insert(id::LUT.to_owned(), mask.into());
            }
            if let Some(moved) = sinks.remove(&a) {
                sinks.entry(y).or_default().extend(moved);
            }
            debug!("inverter {name} absorbed into {} reader(s)", readers.len());
        } else {
            debug!("inverter {name} absorbed into a copy of its driver");
        }

        let inputs = remap.sig(driver_inputs);
        let copy = module.fresh_name("abc9_not");
        for bit in inputs.iter() {
            sinks.entry(bit).or_default().push(copy.clone());
        }
        module.add_cell(copy, Cell::lut(inputs, y, invert_output(driver_mask)))?;
    }

    info!("ABC RESULTS:           input signals: {:>8}", input_count);
    info!("ABC RESULTS:          output signals: {:>8}", output_count);
    module.fixup_ports();

    design.remove_module(&mapped_name);
    let holes_name = holes_name(module_name);
    if design.remove_module(&holes_name).is_some() {
        session.holes.remove(&holes_name);
    }
    Ok(())
}
