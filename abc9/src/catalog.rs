use indexmap::IndexMap;

use boxsplice_netlist::{id, CellType, Design, Module};

use crate::error::{CheckError, Error};

/// Port order the mapper expects for every box type.
///
/// Ports keep their declaration order, except that a carry input and carry output are moved to
/// the very end, input first. Derived (parameter-specialized) copies of a box share the ports of
/// the type they were derived from, so entries are kept for base types only; entries must be
/// rebuilt if a box type's ports change.
#[derive(Debug, Clone, Default)]
pub struct BoxCatalog {
    entries: IndexMap<String, Vec<String>>,
}

/// Ports of the delay placeholder, which the mapper sees as a single-bit blackbox.
const DELAY_PORTS: [&str; 2] = [id::I, id::O];

/// Whether a module is cataloged as a box: it has a box id, or it is a register macro.
pub fn is_box_type(module: &Module) -> bool {
    module.attrs.box_id.is_some() || module.attrs.flop
}

impl BoxCatalog {
    pub fn new() -> BoxCatalog {
        BoxCatalog::default()
    }

    /// Computes the port order of a box type, validating its carry ports.
    pub fn port_order(module: &Module) -> Result<Vec<String>, CheckError> {
        let mut ports = vec![];
        let (mut carry_in, mut carry_out) = (None, None);
        for &port in &module.ports {
            let wire = module.wire(port);
            if !wire.is_port() {
                continue;
            }
            if !wire.attrs.carry {
                ports.push(wire.name.clone());
                continue;
            }
            let slot = match (wire.port_input, wire.port_output) {
                (true, false) => &mut carry_in,
                (false, true) => &mut carry_out,
                _ => return Err(CheckError::InoutCarry { module: module.name.clone(), port: wire.name.clone() }),
            };
            if slot.is_some() {
                return Err(CheckError::MultipleCarry { module: module.name.clone(), output: wire.port_output });
            }
            *slot = Some(wire.name.clone());
        }
        match (carry_in, carry_out) {
            (Some(carry_in), Some(carry_out)) => {
                ports.push(carry_in);
                ports.push(carry_out);
            }
            (Some(_), None) => return Err(CheckError::UnpairedCarry { module: module.name.clone(), output: false }),
            (None, Some(_)) => return Err(CheckError::UnpairedCarry { module: module.name.clone(), output: true }),
            (None, None) => (),
        }
        Ok(ports)
    }

    /// Catalogs every box type of the design that is not cataloged yet.
    pub fn populate(&mut self, design: &Design) -> Result<(), Error> {
        for module in design.modules() {
            if !is_box_type(module) || module.name.starts_with("$paramod") || self.entries.contains_key(&module.name) {
                continue;
            }
            let ports = Self::port_order(module)?;
            self.entries.insert(module.name.clone(), ports);
        }
        Ok(())
    }

    /// Port order of a cataloged box type, or of the delay placeholder.
    pub fn ports(&self, cell_type: &CellType) -> Option<Vec<&str>> {
        match cell_type {
            CellType::Delay => Some(DELAY_PORTS.to_vec()),
            CellType::Instance(name) => {
                self.entries.get(name).map(|ports| ports.iter().map(String::as_str).collect())
            }
            _ => None,
        }
    }

    pub fn require(&self, cell_type: &CellType) -> Result<Vec<&str>, Error> {
        self.ports(cell_type).ok_or_else(|| Error::MissingBoxPorts { box_type: cell_type.name().into_owned() })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use boxsplice_netlist::{Module, Wire};

    use super::BoxCatalog;
    use crate::error::CheckError;

    fn port(module: &mut Module, name: &str, input: bool, carry: bool) {
        let mut wire = Wire::new(name, 1);
        wire.port_input = input;
        wire.port_output = !input;
        wire.attrs.carry = carry;
        let id = module.add_wire(wire).unwrap();
        module.ports.push(id);
    }

    #[test]
    fn test_carry_last() {
        let mut module = Module::new("\\adder");
        port(&mut module, "\\co", false, true);
        port(&mut module, "\\a", true, false);
        port(&mut module, "\\ci", true, true);
        port(&mut module, "\\s", false, false);
        assert_eq!(BoxCatalog::port_order(&module).unwrap(), vec!["\\a", "\\s", "\\ci", "\\co"]);
        assert_eq!(BoxCatalog::port_order(&module), BoxCatalog::port_order(&module));
    }

    #[test]
    fn test_unpaired_carry() {
        let mut module = Module::new("\\adder");
        port(&mut module, "\\a", true, false);
        port(&mut module, "\\ci", true, true);
        assert_eq!(
            BoxCatalog::port_order(&module),
            Err(CheckError::UnpairedCarry { module: "\\adder".into(), output: false })
        );
        port(&mut module, "\\ci2", true, true);
        assert_eq!(
            BoxCatalog::port_order(&module),
            Err(CheckError::MultipleCarry { module: "\\adder".into(), output: false })
        );
    }
}
