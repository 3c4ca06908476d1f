use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;
use tracing::{debug, info};

use boxsplice_netlist::{Cell, CellType, Design, SigBit, SigSpec, Wire};

use crate::check::timing_per_bit;
use crate::error::{CheckError, Error};
use crate::session::{FlopBox, Session};

/// Required times annotated on a port, one per bit, or none.
fn required_values(box_type: &str, wire: &Wire) -> Result<Vec<i64>, CheckError> {
    match &wire.attrs.required {
        Some(required) => timing_per_bit(box_type, wire, "required", required),
        None => Ok(vec![]),
    }
}

/// A delay placeholder chain to splice in front of one input port.
struct Splice {
    cell: String,
    port: String,
    delays: Vec<i64>,
}

fn flop_box(design: &mut Design, session: &mut Session, name: &str) -> Result<FlopBox, Error> {
    let module = design.module_mut(name).ok_or_else(|| Error::MissingBoxPorts { box_type: name.to_owned() })?;
    let mut required = vec![];
    let mut outputs = 0;
    for &port in &module.ports {
        let wire = module.wire(port);
        if wire.port_output {
            outputs += 1;
        }
        if !wire.port_input {
            continue;
        }
        let mut values = required_values(name, wire)?;
        values.resize(wire.width, 0);
        required.extend(values);
    }
    if outputs != 1 {
        return Err(CheckError::FlopOutputs { module: name.to_owned(), count: outputs }.into());
    }
    let box_id = match module.attrs.box_id {
        Some(box_id) => box_id,
        None => {
            let box_id = session.next_flop_id;
            session.next_flop_id += 1;
            module.attrs.box_id = Some(box_id);
            box_id
        }
    };
    Ok(FlopBox { name: name.to_owned(), box_id, inputs: required.len(), outputs, required })
}

/// Splices a delay placeholder in front of every input bit of a box instance that has a required
/// time, records the distinct delays used by each module, and builds the box descriptor of every
/// register macro in use.
///
/// Instances of types with a box id are skipped, since their timing is part of their own box
/// descriptor.
pub fn prep_delays(design: &mut Design, session: &mut Session, modules: &[String]) -> Result<(), Error> {
    let mut requireds: BTreeMap<(String, String), Vec<i64>> = BTreeMap::new();
    let mut flops: IndexSet<String> = IndexSet::new();
    for module_name in modules {
        let Some(module) = design.module(module_name) else { continue };
        if module.has_processes() {
            info!("Skipping module {} as it contains processes.", module_name);
            continue;
        }

        let mut flop_instances = vec![];
        let mut splices = vec![];
        let mut delays = BTreeSet::new();
        for (name, cell) in module.cells() {
            if matches!(cell.type_, CellType::And | CellType::Not | CellType::Ff | CellType::Delay) {
                continue;
            }
            let Some(instance) = design.instantiated(cell) else { continue };
            if !instance.attrs.is_box_like() {
                continue;
            }
            if instance.attrs.flop {
                flop_instances.push((instance.name.clone(), cell.parameters.clone()));
            } else if instance.attrs.box_id.is_some() {
                continue;
            }
            for port in cell.connections.keys() {
                let Some(wire) = instance.wire_by_name(port) else { continue };
                if !wire.port_input {
                    continue;
                }
                let key = (instance.name.clone(), port.clone());
                let values = match requireds.get(&key) {
                    Some(values) => values.clone(),
                    None => {
                        let values = required_values(&instance.name, wire)?;
                        requireds.insert(key, values.clone());
                        values
                    }
                };
                if values.is_empty() {
                    continue;
                }
                delays.extend(values.iter().copied());
                splices.push(Splice { cell: name.to_owned(), port: port.clone(), delays: values });
            }
        }

        for (type_name, parameters) in flop_instances {
            if let Some(derived) = design.derive(&type_name, &parameters) {
                flops.insert(derived);
            }
        }

        let Some(module) = design.module_mut(module_name) else { continue };
        for splice in splices {
            let Some(sig) = module.cell(&splice.cell).and_then(|cell| cell.port(&splice.port)).cloned() else {
                continue;
            };
            let delayed = module.add_fresh_wire("abc9_delay", sig.len());
            let mut output = SigSpec::new();
            for (offset, bit) in sig.iter().enumerate() {
                let Some(&delay) = splice.delays.get(offset) else {
                    output.push(bit);
                    continue;
                };
                let delayed_bit = SigBit::Wire(delayed, offset);
                let name = module.fresh_name("abc9_delay");
                module.add_cell(name, Cell::delay(bit, delayed_bit, delay))?;
                output.push(delayed_bit);
            }
            debug!("{}.{} delayed by {} placeholder(s)", splice.cell, splice.port, output.len());
            if let Some(cell) = module.cell_mut(&splice.cell) {
                cell.set_port(&splice.port, output);
            }
        }
        module.attrs.delays = Some(delays);
    }

    for name in flops {
        if session.flop_boxes.contains_key(&name) {
            continue;
        }
        let flop_box = flop_box(design, session, &name)?;
        debug!("register macro {} is box {}", name, flop_box.box_id);
        session.flop_boxes.insert(name, flop_box);
    }
    Ok(())
}
