use std::collections::BTreeMap;

use indexmap::{IndexMap, map::Entry};

use crate::{Cell, Module, NameConflict, ParamValue, PortDirection};

/// A collection of modules, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Design {
    modules: IndexMap<String, Module>,
}

impl Design {
    pub fn new() -> Design {
        Design { modules: IndexMap::new() }
    }

    pub fn add_module(&mut self, module: Module) -> Result<&mut Module, NameConflict> {
        match self.modules.entry(module.name.clone()) {
            Entry::Occupied(entry) => Err(NameConflict::Module { name: entry.key().clone() }),
            Entry::Vacant(entry) => Ok(entry.insert(module)),
        }
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    pub fn remove_module(&mut self, name: &str) -> Option<Module> {
        self.modules.shift_remove(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// The module a cell instantiates, if it instantiates one that exists in this design.
    pub fn instantiated(&self, cell: &Cell) -> Option<&Module> {
        cell.type_.instance_of().and_then(|name| self.module(name))
    }

    pub fn port_direction(&self, cell: &Cell, port: &str) -> Option<PortDirection> {
        if let Some(direction) = cell.type_.builtin_direction(port) {
            return Some(direction);
        }
        let wire = self.instantiated(cell)?.wire_by_name(port)?;
        match (wire.port_input, wire.port_output) {
            (true, true) => Some(PortDirection::Inout),
            (true, false) => Some(PortDirection::Input),
            (false, true) => Some(PortDirection::Output),
            (false, false) => None,
        }
    }

    /// Returns the name of `module_name` specialized for `parameters`, creating the specialized
    /// copy on first use. Without parameters, the module itself is the specialization.
    pub fn derive(&mut self, module_name: &str, parameters: &BTreeMap<String, ParamValue>) -> Option<String> {
        let base = self.module(module_name)?;
        if parameters.is_empty() {
            return Some(module_name.to_owned());
        }
        let mut derived_name = format!("$paramod{module_name}");
        for (name, value) in parameters {
            let value = match value {
                ParamValue::String(text) => text.clone(),
                value => value.to_string(),
            };
            derived_name.push_str(&format!("{name}={value}"));
        }
        if self.modules.contains_key(&derived_name) {
            return Some(derived_name);
        }
        let mut derived = base.clone();
        derived.name = derived_name.clone();
        for (name, value) in parameters {
            derived.parameters.insert(name.clone(), value.clone());
        }
        self.modules.insert(derived_name.clone(), derived);
        Some(derived_name)
    }
}
