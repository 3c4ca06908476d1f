#![allow(dead_code)]

use std::collections::BTreeMap;

use boxsplice_abc9::lut::lookup;
use boxsplice_netlist::{id, CellType, Module, SigBit, SigMap, State};

/// Evaluates the combinational cells of a module for the given input port values (least
/// significant bit first), and returns the value of every output port bit.
pub fn simulate(module: &Module, inputs: &BTreeMap<&str, Vec<bool>>) -> BTreeMap<String, Vec<Option<bool>>> {
    let sigmap = SigMap::new(module);
    let mut values: BTreeMap<SigBit, bool> = BTreeMap::new();
    for &port in &module.ports {
        let wire = module.wire(port);
        let Some(bits) = inputs.get(wire.name.as_str()).filter(|_| wire.port_input) else { continue };
        for (offset, &value) in bits.iter().enumerate() {
            values.insert(sigmap.bit(SigBit::Wire(port, offset)), value);
        }
    }
    let get = |values: &BTreeMap<SigBit, bool>, bit: SigBit| match sigmap.bit(bit) {
        SigBit::Const(State::Zero) => Some(false),
        SigBit::Const(State::One) => Some(true),
        SigBit::Const(_) => None,
        bit => values.get(&bit).copied(),
    };

    loop {
        let mut changed = false;
        for (_, cell) in module.cells() {
            let input = |port: &str| cell.port_bit(port).and_then(|bit| get(&values, bit));
            let result = match cell.type_ {
                CellType::Buf => input(id::A),
                CellType::Not => input(id::A).map(|a| !a),
                CellType::And => input(id::A).zip(input(id::B)).map(|(a, b)| a & b),
                CellType::Or => input(id::A).zip(input(id::B)).map(|(a, b)| a | b),
                CellType::Xor => input(id::A).zip(input(id::B)).map(|(a, b)| a ^ b),
                CellType::Mux => input(id::S).and_then(|s| if s { input(id::B) } else { input(id::A) }),
                CellType::Lut => {
                    let bits = cell
                        .port(id::A)
                        .map(|sig| sig.iter().map(|bit| get(&values, bit)).collect::<Option<Vec<_>>>());
                    match (bits.flatten(), cell.lut_mask()) {
                        (Some(bits), Some(mask)) => lookup(&mask, bits),
                        _ => None,
                    }
                }
                _ => None,
            };
            let (Some(result), Some(output)) = (result, cell.port_bit(id::Y)) else { continue };
            let output = sigmap.bit(output);
            if !output.is_const() && values.insert(output, result) != Some(result) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut outputs = BTreeMap::new();
    for &port in &module.ports {
        let wire = module.wire(port);
        if wire.port_output {
            let bits = module.sig(port).iter().map(|bit| get(&values, bit)).collect();
            outputs.insert(wire.name.clone(), bits);
        }
    }
    outputs
}

/// Every assignment of values to the named single-bit inputs.
pub fn assignments<'a>(names: &[&'a str]) -> Vec<BTreeMap<&'a str, Vec<bool>>> {
    (0..1usize << names.len())
        .map(|value| {
            names.iter().enumerate().map(|(index, &name)| (name, vec![value & (1 << index) != 0])).collect()
        })
        .collect()
}
