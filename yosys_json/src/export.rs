use std::collections::BTreeMap;
use std::io::BufWriter;

use jzon::JsonValue;

use boxsplice_netlist::{Attributes, Design, Module, ParamValue, PortDirection, SigBit, SigMap, SigSpec, State};

use crate::json_name;
use crate::yosys::{self, CellDetails, MetadataValue, NetDetails, PortDetails};

struct Counter(usize);

impl Counter {
    fn advance(&mut self) -> usize {
        let index = self.0;
        self.0 += 1;
        index
    }
}

/// Numbers the nets of one module. Connected bits share a number.
struct NetIndexer {
    sigmap: SigMap,
    map: BTreeMap<SigBit, usize>,
    next: Counter,
}

impl NetIndexer {
    fn new(module: &Module) -> NetIndexer {
        NetIndexer { sigmap: SigMap::new(module), map: BTreeMap::new(), next: Counter(2) }
    }

    fn bit(&mut self, bit: SigBit) -> yosys::Bit {
        match self.sigmap.bit(bit) {
            SigBit::Const(State::Zero) => yosys::Bit::Zero,
            SigBit::Const(State::One) => yosys::Bit::One,
            SigBit::Const(State::Undef) => yosys::Bit::Undef,
            SigBit::Const(State::HiZ) => yosys::Bit::HiZ,
            bit => {
                let next = &mut self.next;
                yosys::Bit::Net(*self.map.entry(bit).or_insert_with(|| next.advance()))
            }
        }
    }

    fn sig(&mut self, sig: &SigSpec) -> yosys::BitVector {
        yosys::BitVector(sig.iter().map(|bit| self.bit(bit)).collect())
    }
}

fn export_metadata(entries: Vec<(String, ParamValue)>) -> yosys::Metadata {
    let mut metadata = yosys::Metadata::new();
    for (name, value) in entries {
        metadata.add(json_name(&name), MetadataValue::from(&value));
    }
    metadata
}

fn export_params<'a>(params: impl IntoIterator<Item = (&'a String, &'a ParamValue)>) -> yosys::Metadata {
    let mut metadata = yosys::Metadata::new();
    for (name, value) in params {
        metadata.add(json_name(name), MetadataValue::from(value));
    }
    metadata
}

fn export_direction(direction: PortDirection) -> yosys::PortDirection {
    match direction {
        PortDirection::Input => yosys::PortDirection::Input,
        PortDirection::Output => yosys::PortDirection::Output,
        PortDirection::Inout => yosys::PortDirection::Inout,
    }
}

fn export_module(design: &Design, module: &Module) -> yosys::Module {
    let mut indexer = NetIndexer::new(module);

    let mut ports = yosys::Map::new();
    for &id in &module.ports {
        let wire = module.wire(id);
        let direction = match (wire.port_input, wire.port_output) {
            (true, true) => PortDirection::Inout,
            (true, false) => PortDirection::Input,
            (false, true) => PortDirection::Output,
            (false, false) => continue,
        };
        let bits = indexer.sig(&module.sig(id));
        ports.add(json_name(&wire.name), PortDetails { direction: export_direction(direction), bits });
    }

    let mut cells = yosys::Map::new();
    for (name, cell) in module.cells() {
        let mut port_directions = yosys::Map::new();
        let mut connections = yosys::Map::new();
        for (port, sig) in &cell.connections {
            if let Some(direction) = design.port_direction(cell, port) {
                port_directions.add(json_name(port), export_direction(direction));
            }
            connections.add(json_name(port), indexer.sig(sig));
        }
        cells.add(
            json_name(name),
            CellDetails {
                hide_name: name.starts_with('$'),
                type_: json_name(&cell.type_.name()).to_owned(),
                parameters: export_params(&cell.parameters),
                attributes: export_metadata(cell.attrs.to_raw()),
                port_directions,
                connections,
            },
        );
    }

    let mut netnames = yosys::Map::new();
    for (id, wire) in module.wires() {
        let bits = indexer.sig(&module.sig(id));
        netnames.add(
            json_name(&wire.name),
            NetDetails { hide_name: wire.name.starts_with('$'), attributes: export_metadata(wire.attrs.to_raw()), bits },
        );
    }

    yosys::Module {
        attributes: export_metadata(module.attrs.to_raw()),
        parameter_default_values: export_params(&module.parameters),
        ports,
        cells,
        netnames,
    }
}

/// Writes every module of `design` as a Yosys JSON netlist.
///
/// Processes have no JSON representation and are not written.
pub fn export(writer: &mut impl std::io::Write, design: &Design) -> std::io::Result<()> {
    let mut ys_modules = yosys::Map::new();
    for module in design.modules() {
        ys_modules.add(json_name(&module.name), export_module(design, module));
    }
    let ys_design = yosys::Design { creator: "boxsplice".into(), modules: ys_modules };
    JsonValue::from(ys_design).write_pretty(&mut BufWriter::new(writer), 4)
}
