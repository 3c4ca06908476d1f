use std::collections::BTreeMap;
use std::fmt::Display;

use indexmap::IndexMap;

use crate::{Cell, ModuleAttrs, ParamValue, SigBit, SigSpec, WireAttrs, WireId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub name: String,
    pub width: usize,
    pub port_input: bool,
    pub port_output: bool,
    pub attrs: WireAttrs,
}

impl Wire {
    pub fn new(name: impl Into<String>, width: usize) -> Wire {
        Wire { name: name.into(), width, port_input: false, port_output: false, attrs: WireAttrs::default() }
    }

    pub fn is_port(&self) -> bool {
        self.port_input || self.port_output
    }
}

/// A wire, cell, or module added under a name that is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameConflict {
    Wire { module: String, name: String },
    Cell { module: String, name: String },
    Module { name: String },
}

impl Display for NameConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameConflict::Wire { module, name } => write!(f, "wire {name} already exists in {module}"),
            NameConflict::Cell { module, name } => write!(f, "cell {name} already exists in {module}"),
            NameConflict::Module { name } => write!(f, "module {name} already exists"),
        }
    }
}

impl std::error::Error for NameConflict {}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub attrs: ModuleAttrs,
    /// Parameter defaults.
    pub parameters: BTreeMap<String, ParamValue>,
    wires: Vec<Wire>,
    wire_names: BTreeMap<String, WireId>,
    /// Module boundary in declaration order.
    pub ports: Vec<WireId>,
    cells: IndexMap<String, Cell>,
    /// Pairs of (driven, driver) signals of equal width.
    pub connections: Vec<(SigSpec, SigSpec)>,
    /// Names of behavioral processes not yet lowered to cells.
    pub processes: Vec<String>,
    next_auto: usize,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            attrs: ModuleAttrs::default(),
            parameters: BTreeMap::new(),
            wires: vec![],
            wire_names: BTreeMap::new(),
            ports: vec![],
            cells: IndexMap::new(),
            connections: vec![],
            processes: vec![],
            next_auto: 1,
        }
    }

    pub fn add_wire(&mut self, wire: Wire) -> Result<WireId, NameConflict> {
        if self.wire_names.contains_key(&wire.name) {
            return Err(NameConflict::Wire { module: self.name.clone(), name: wire.name });
        }
        Ok(self.push_wire(wire))
    }

    fn push_wire(&mut self, wire: Wire) -> WireId {
        let id = WireId(self.wires.len() as u32);
        self.wire_names.insert(wire.name.clone(), id);
        self.wires.push(wire);
        id
    }

    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.index()]
    }

    pub fn wire_mut(&mut self, id: WireId) -> &mut Wire {
        &mut self.wires[id.index()]
    }

    pub fn wire_id(&self, name: &str) -> Option<WireId> {
        self.wire_names.get(name).copied()
    }

    pub fn wire_by_name(&self, name: &str) -> Option<&Wire> {
        self.wire_id(name).map(|id| self.wire(id))
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter().enumerate().map(|(index, wire)| (WireId(index as u32), wire))
    }

    /// The whole of a wire as a signal.
    pub fn sig(&self, id: WireId) -> SigSpec {
        SigSpec::from_wire(id, self.wire(id).width)
    }

    pub fn add_cell(&mut self, name: impl Into<String>, cell: Cell) -> Result<(), NameConflict> {
        let name = name.into();
        if self.cells.contains_key(&name) {
            return Err(NameConflict::Cell { module: self.name.clone(), name });
        }
        self.cells.insert(name, cell);
        Ok(())
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.get(name)
    }

    pub fn cell_mut(&mut self, name: &str) -> Option<&mut Cell> {
        self.cells.get_mut(name)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = (&str, &mut Cell)> {
        self.cells.iter_mut().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn cell_names(&self) -> Vec<String> {
        self.cells.keys().cloned().collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn remove_cell(&mut self, name: &str) -> Option<Cell> {
        self.cells.shift_remove(name)
    }

    /// Renames a cell in place, keeping its position among the module's cells.
    pub fn rename_cell(&mut self, from: &str, to: impl Into<String>) -> Result<(), NameConflict> {
        let to = to.into();
        if self.cells.contains_key(&to) {
            return Err(NameConflict::Cell { module: self.name.clone(), name: to });
        }
        if let Some(index) = self.cells.get_index_of(from) {
            let cell = self.cells.shift_remove_index(index).map(|(_, cell)| cell);
            if let Some(cell) = cell {
                self.cells.shift_insert(index, to, cell);
            }
        }
        Ok(())
    }

    pub fn has_processes(&self) -> bool {
        !self.processes.is_empty()
    }

    pub fn connect(&mut self, lhs: impl Into<SigSpec>, rhs: impl Into<SigSpec>) {
        let (lhs, rhs) = (lhs.into(), rhs.into());
        assert_eq!(lhs.len(), rhs.len(), "connection width mismatch in {}", self.name);
        self.connections.push((lhs, rhs));
    }

    /// Returns an internal name, derived from `hint`, that no wire or cell of this module uses.
    pub fn fresh_name(&mut self, hint: &str) -> String {
        loop {
            let name = format!("$auto${}${}", hint.trim_start_matches(['\\', '$']), self.next_auto);
            self.next_auto += 1;
            if !self.wire_names.contains_key(&name) && !self.cells.contains_key(&name) {
                return name;
            }
        }
    }

    /// Adds a fresh internal wire.
    pub fn add_fresh_wire(&mut self, hint: &str, width: usize) -> WireId {
        let name = self.fresh_name(hint);
        self.push_wire(Wire::new(name, width))
    }

    pub fn add_fresh_bit(&mut self, hint: &str) -> SigBit {
        SigBit::Wire(self.add_fresh_wire(hint, 1), 0)
    }

    /// Re-derives the port list: existing ports that still are ports keep their order, followed
    /// by any new port wires and any wires cut by SCC marking, in declaration order.
    pub fn fixup_ports(&mut self) {
        let is_boundary = |wire: &Wire| wire.is_port() || wire.attrs.is_scc_cut();
        let mut ports: Vec<WireId> = self.ports.iter().copied().filter(|&id| is_boundary(self.wire(id))).collect();
        let (plain, cut): (Vec<_>, Vec<_>) = self
            .wires()
            .filter(|(id, wire)| is_boundary(*wire) && !ports.contains(id))
            .map(|(id, wire)| (id, wire.is_port()))
            .partition(|&(_, is_port)| is_port);
        ports.extend(plain.into_iter().map(|(id, _)| id));
        ports.extend(cut.into_iter().map(|(id, _)| id));
        self.ports = ports;
    }
}

#[cfg(test)]
mod test {
    use super::{Module, NameConflict, Wire};
    use crate::Cell;
    use crate::CellType;

    #[test]
    fn test_fixup_ports() {
        let mut module = Module::new("\\top");
        let a = module.add_wire(Wire { port_input: true, ..Wire::new("\\a", 1) }).unwrap();
        let n = module.add_wire(Wire::new("\\n", 1)).unwrap();
        let y = module.add_wire(Wire { port_output: true, ..Wire::new("\\y", 1) }).unwrap();
        module.ports = vec![y, a];
        module.wire_mut(n).attrs.keep = true;
        module.wire_mut(n).attrs.scc_id = Some(0);
        module.fixup_ports();
        assert_eq!(module.ports, vec![y, a, n]);
        module.wire_mut(n).attrs.scc_id = None;
        module.wire_mut(a).port_input = false;
        module.fixup_ports();
        assert_eq!(module.ports, vec![y]);
    }

    #[test]
    fn test_rename_cell_keeps_position() {
        let mut module = Module::new("\\top");
        module.add_cell("\\c1", Cell::new(CellType::Buf)).unwrap();
        module.add_cell("\\c2", Cell::new(CellType::Not)).unwrap();
        module.add_cell("\\c3", Cell::new(CellType::Buf)).unwrap();
        module.rename_cell("\\c2", "$renamed").unwrap();
        assert_eq!(module.cell_names(), vec!["\\c1", "$renamed", "\\c3"]);
        assert_eq!(module.cell("$renamed").map(|cell| cell.type_.clone()), Some(CellType::Not));
        let fresh = module.fresh_name("\\c1");
        assert!(fresh.starts_with('$'));
        assert!(module.cell(&fresh).is_none());
    }

    #[test]
    fn test_duplicate_names() {
        let mut module = Module::new("\\top");
        let a = module.add_wire(Wire::new("\\a", 1)).unwrap();
        assert_eq!(
            module.add_wire(Wire::new("\\a", 2)),
            Err(NameConflict::Wire { module: "\\top".into(), name: "\\a".into() })
        );
        assert_eq!(module.wire_id("\\a"), Some(a));
        assert_eq!(module.wire(a).width, 1);

        module.add_cell("\\c1", Cell::new(CellType::Buf)).unwrap();
        module.add_cell("\\c2", Cell::new(CellType::Not)).unwrap();
        assert_eq!(
            module.add_cell("\\c1", Cell::new(CellType::Not)),
            Err(NameConflict::Cell { module: "\\top".into(), name: "\\c1".into() })
        );
        assert!(module.rename_cell("\\c1", "\\c2").is_err());
        assert_eq!(module.cell_names(), vec!["\\c1", "\\c2"]);
        assert_eq!(module.cell("\\c1").map(|cell| cell.type_.clone()), Some(CellType::Buf));
    }
}
