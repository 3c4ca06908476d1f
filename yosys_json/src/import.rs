use std::collections::BTreeMap;

use boxsplice_netlist::{
    Attributes, Cell, CellAttrs, CellType, Design, Module, ModuleAttrs, NameConflict, ParamValue, SigBit, SigSpec,
    State, Wire, WireAttrs,
};

use crate::{netlist_name, yosys};

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(jzon::Error),
    Syntax(yosys::SyntaxError),
    Semantic(String),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<NameConflict> for Error {
    fn from(error: NameConflict) -> Self {
        Error::Semantic(error.to_string())
    }
}

impl From<jzon::Error> for Error {
    fn from(error: jzon::Error) -> Self {
        Self::Json(error)
    }
}

impl From<yosys::SyntaxError> for Error {
    fn from(error: yosys::SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(error) => write!(f, "I/O error: {}", error),
            Error::Json(error) => write!(f, "JSON parse error: {}", error),
            Error::Syntax(error) => write!(f, "{}", error),
            Error::Semantic(message) => write!(f, "semantic error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

fn import_metadata<A: Attributes>(metadata: &yosys::Metadata) -> A {
    A::from_raw(metadata.iter().map(|(name, value)| (netlist_name(name), ParamValue::from(value.clone()))))
}

struct ModuleImporter<'a> {
    json: &'a yosys::Module,
    module: Module,
    /// The first wire bit seen carrying each JSON net.
    nets: BTreeMap<usize, SigBit>,
}

impl ModuleImporter<'_> {
    fn constant(bit: yosys::Bit) -> Option<State> {
        match bit {
            yosys::Bit::Zero => Some(State::Zero),
            yosys::Bit::One => Some(State::One),
            yosys::Bit::Undef => Some(State::Undef),
            yosys::Bit::HiZ => Some(State::HiZ),
            yosys::Bit::Net(_) => None,
        }
    }

    fn handle_netnames(&mut self) -> Result<(), Error> {
        for (name, details) in self.json.netnames.iter() {
            let mut wire = Wire::new(netlist_name(name), details.bits.len());
            wire.attrs = import_metadata::<WireAttrs>(&details.attributes);
            let id = self.module.add_wire(wire)?;
            for (offset, &bit) in details.bits.iter().enumerate() {
                let wire_bit = SigBit::Wire(id, offset);
                match bit {
                    yosys::Bit::Net(net) => match self.nets.get(&net) {
                        Some(&first) => self.module.connect(wire_bit, first),
                        None => {
                            self.nets.insert(net, wire_bit);
                        }
                    },
                    bit => {
                        if let Some(state) = Self::constant(bit) {
                            self.module.connect(wire_bit, state);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_ports(&mut self) -> Result<(), Error> {
        for (name, port) in self.json.ports.iter() {
            let name = netlist_name(name);
            let id = match self.module.wire_id(&name) {
                Some(id) => id,
                None => {
                    let bits = port.bits.clone();
                    let id = self.module.add_wire(Wire::new(name.clone(), bits.len()))?;
                    let sig = self.signal(&bits);
                    self.module.connect(self.module.sig(id), sig);
                    id
                }
            };
            if self.module.wire(id).width != port.bits.len() {
                return Err(Error::Semantic(format!("port {name} does not match its net width")));
            }
            let wire = self.module.wire_mut(id);
            match port.direction {
                yosys::PortDirection::Input => wire.port_input = true,
                yosys::PortDirection::Output => wire.port_output = true,
                yosys::PortDirection::Inout => {
                    wire.port_input = true;
                    wire.port_output = true;
                }
            }
            self.module.ports.push(id);
        }
        Ok(())
    }

    fn signal(&mut self, bits: &yosys::BitVector) -> SigSpec {
        let mut sig = SigSpec::new();
        for &bit in bits.iter() {
            match bit {
                yosys::Bit::Net(net) => {
                    let bit = match self.nets.get(&net) {
                        Some(&bit) => bit,
                        None => {
                            let bit = self.module.add_fresh_bit(&format!("net{net}"));
                            self.nets.insert(net, bit);
                            bit
                        }
                    };
                    sig.push(bit);
                }
                bit => sig.push(Self::constant(bit).unwrap_or(State::Undef)),
            }
        }
        sig
    }

    fn handle_cells(&mut self) -> Result<(), Error> {
        for (name, details) in self.json.cells.iter() {
            let mut cell = Cell::new(CellType::from_name(&netlist_name(&details.type_)));
            cell.attrs = import_metadata::<CellAttrs>(&details.attributes);
            for (param, value) in details.parameters.iter() {
                cell.parameters.insert(netlist_name(param), ParamValue::from(value.clone()));
            }
            for (port, bits) in details.connections.iter() {
                let sig = self.signal(bits);
                cell.set_port(&netlist_name(port), sig);
            }
            self.module.add_cell(netlist_name(name), cell)?;
        }
        Ok(())
    }
}

fn import_module(name: &str, json: &yosys::Module) -> Result<Module, Error> {
    let mut module = Module::new(netlist_name(name));
    module.attrs = import_metadata::<ModuleAttrs>(&json.attributes);
    for (param, value) in json.parameter_default_values.iter() {
        module.parameters.insert(netlist_name(param), ParamValue::from(value.clone()));
    }
    let mut importer = ModuleImporter { json, module, nets: BTreeMap::new() };
    importer.handle_netnames()?;
    importer.handle_ports()?;
    importer.handle_cells()?;
    Ok(importer.module)
}

/// Reads every module of a Yosys JSON netlist.
pub fn import(reader: &mut impl std::io::Read) -> Result<Design, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let json = jzon::parse(text.as_str())?;
    let yosys_design = yosys::Design::try_from(json)?;

    let mut design = Design::new();
    for (name, module) in yosys_design.modules.iter() {
        design.add_module(import_module(name, module)?)?;
    }
    Ok(design)
}
