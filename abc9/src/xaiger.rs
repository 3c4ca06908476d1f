use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use boxsplice_netlist::{id, CellType, Design, Module, ParamValue, SigBit, SigMap, SigSpec, Wire, WireId};

use crate::catalog::is_box_type;
use crate::error::Error;
use crate::graph::boundary_graph;
use crate::session::{holes_name, HolesInfo, Session};

fn short(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

/// Adds a wire, or an internal wire derived from the name if it is taken.
fn add_named_wire(holes: &mut Module, name: String, width: usize) -> WireId {
    match holes.add_wire(Wire::new(name.clone(), width)) {
        Ok(id) => id,
        Err(_) => holes.add_fresh_wire(&name, width),
    }
}

/// The holes input `\i<index>`. Inputs are positional, so box types processed later reuse the
/// inputs created for earlier ones.
fn box_input(holes: &mut Module, index: usize) -> Result<SigBit, Error> {
    let name = format!("\\i{index}");
    if let Some(id) = holes.wire_id(&name) {
        return Ok(SigBit::Wire(id, 0));
    }
    let id = holes.add_wire(Wire { port_input: true, ..Wire::new(name, 1) })?;
    holes.ports.push(id);
    Ok(SigBit::Wire(id, 0))
}

/// Copies the logic of a white box into the holes network as the logic of instance `cell`.
fn inline_whitebox(
    holes: &mut Module,
    info: &mut HolesInfo,
    whitebox: &Module,
    derived: &str,
    cell: &str,
    ports: &[String],
) -> Result<(), Error> {
    let mut wire_map: BTreeMap<WireId, SigSpec> = BTreeMap::new();
    let mut box_inputs = 0;
    for port in ports {
        let id = whitebox
            .wire_id(port)
            .ok_or_else(|| Error::UnknownWire { module: derived.to_owned(), wire: port.clone() })?;
        let wire = whitebox.wire(id);
        if wire.port_input && wire.port_output {
            return Err(Error::MalformedCell { module: derived.to_owned(), cell: cell.to_owned(), port: port.clone() });
        }
        if wire.port_input {
            let mut sig = SigSpec::new();
            for _ in 0..wire.width {
                box_inputs += 1;
                sig.push(box_input(holes, box_inputs)?);
            }
            wire_map.insert(id, sig);
        } else if wire.port_output {
            let output = add_named_wire(holes, format!("{derived}.{}", short(port)), wire.width);
            wire_map.insert(id, holes.sig(output));
        }
    }
    for (id, wire) in whitebox.wires() {
        if wire_map.contains_key(&id) {
            continue;
        }
        let internal = add_named_wire(holes, format!("{cell}.{}", short(&wire.name)), wire.width);
        wire_map.insert(id, holes.sig(internal));
    }

    let map = |sig: &SigSpec| {
        sig.map(|bit| match bit {
            SigBit::Wire(id, offset) => wire_map.get(&id).map_or(bit, |sig| sig[offset]),
            bit => bit,
        })
    };
    for (lhs, rhs) in &whitebox.connections {
        holes.connect(map(lhs), map(rhs));
    }
    let mut flops = vec![];
    for (name, inner) in whitebox.cells() {
        let mut copy = inner.clone();
        for sig in copy.connections.values_mut() {
            *sig = map(sig);
        }
        let mut name = format!("{cell}.{}", short(name));
        if holes.cell(&name).is_some() {
            name = holes.fresh_name(&name);
        }
        if matches!(copy.type_, CellType::Dff(_)) {
            flops.push(name.clone());
        }
        holes.add_cell(name, copy)?;
    }

    if whitebox.attrs.flop {
        box_inputs += 1;
        let input = box_input(holes, box_inputs)?;
        let feedback = add_named_wire(holes, HolesInfo::feedback_wire_name(cell), 1);
        holes.connect(SigBit::Wire(feedback, 0), input);
        for name in flops {
            info.feedback.insert(name, SigBit::Wire(feedback, 0));
        }
    }
    debug!("inlined {} as {} with {} input bit(s)", derived, cell, box_inputs);
    Ok(())
}

/// A box instance picked up by extraction, in dependency order.
struct BoxInstance {
    name: String,
    type_: CellType,
    parameters: BTreeMap<String, ParamValue>,
}

/// Builds the holes network `<module>$holes` describing the boxes of a module to the mapper.
///
/// Box instances are visited in dependency order and numbered in that order. The logic of every
/// white box type is copied into the holes network once, fed by the positional inputs `\i1`,
/// `\i2`, ... (plus one register feedback input for register macros); the outputs of each box
/// instance become outputs `$abc<cell>.<port>` of the holes network. Outputs of black boxes are
/// driven with zeroes.
///
/// Register macros are only treated as boxes if `dff` is set. Nothing is done if the module
/// has no boxes.
pub fn prep_xaiger(design: &mut Design, session: &mut Session, module_name: &str, dff: bool) -> Result<(), Error> {
    session.catalog.populate(design)?;
    let Some(module) = design.module(module_name) else { return Ok(()) };
    let sigmap = SigMap::new(module);
    let (graph, has_boxes) = boundary_graph(design, module, &sigmap, dff);
    if !has_boxes {
        debug!("{module_name} has no boxes");
        return Ok(());
    }
    let order = graph.sort().map_err(|cells| {
        for (index, cells) in cells.iter().enumerate() {
            debug!("  loop {index}: {}", cells.join(" "));
        }
        Error::Loop { module: module_name.to_owned(), cells }
    })?;
    let boxes = order
        .into_iter()
        .filter_map(|name| {
            let cell = module.cell(&name)?;
            let is_box = cell.type_ == CellType::Delay || design.instantiated(cell).is_some_and(is_box_type);
            is_box.then(|| BoxInstance { name, type_: cell.type_.clone(), parameters: cell.parameters.clone() })
        })
        .collect::<Vec<_>>();

    let holes_name = holes_name(module_name);
    if design.remove_module(&holes_name).is_some() {
        debug!("replacing stale {holes_name}");
    }
    let mut holes = Module::new(holes_name.clone());
    holes.attrs.holes = true;
    let mut info = HolesInfo::default();
    let mut processed = BTreeSet::new();
    for instance in &boxes {
        let ports = session.catalog.require(&instance.type_)?.into_iter().map(str::to_owned).collect::<Vec<_>>();

        let mut outputs = vec![];
        let mut whitebox_outputs = None;
        match instance.type_.instance_of() {
            None => outputs.extend(ports.iter().filter(|port| *port == id::O).map(|port| (port.clone(), 1))),
            Some(base) => {
                let derived = design
                    .derive(base, &instance.parameters)
                    .ok_or_else(|| Error::MissingBoxPorts { box_type: base.to_owned() })?;
                let Some(box_module) = design.module(&derived) else { continue };
                if processed.insert(derived.clone()) && box_module.attrs.whitebox {
                    inline_whitebox(&mut holes, &mut info, box_module, &derived, &instance.name, &ports)?;
                }
                for port in &ports {
                    if let Some(wire) = box_module.wire_by_name(port).filter(|wire| wire.port_output) {
                        outputs.push((port.clone(), wire.width));
                    }
                }
                if box_module.attrs.whitebox {
                    whitebox_outputs = Some(derived);
                }
            }
        }

        for (port, width) in outputs {
            let output = add_named_wire(&mut holes, format!("$abc{}.{}", instance.name, short(&port)), width);
            holes.wire_mut(output).port_output = true;
            holes.ports.push(output);
            let driver = whitebox_outputs
                .as_ref()
                .and_then(|derived| holes.wire_id(&format!("{derived}.{}", short(&port))))
                .map(|id| holes.sig(id))
                .filter(|sig| sig.len() == width)
                .unwrap_or_else(|| SigSpec::from(vec![SigBit::ZERO; width]));
            holes.connect(holes.sig(output), driver);
        }
    }

    let Some(module) = design.module_mut(module_name) else { return Ok(()) };
    for (seq, instance) in boxes.iter().enumerate() {
        if let Some(cell) = module.cell_mut(&instance.name) {
            cell.attrs.box_seq = Some(seq as i64);
        }
    }
    info!("{}: {} box instance(s) extracted into {}", module_name, boxes.len(), holes_name);
    design.add_module(holes)?;
    session.holes.insert(holes_name, info);
    Ok(())
}
