//! Reading and writing designs in the Yosys JSON netlist format.

mod yosys;
pub mod import;
pub mod export;

pub use import::{import, Error as ImportError};
pub use export::export;

/// Yosys JSON names public identifiers without their leading `\`.
pub(crate) fn netlist_name(json_name: &str) -> String {
    if json_name.starts_with('$') { json_name.to_owned() } else { format!("\\{json_name}") }
}

pub(crate) fn json_name(netlist_name: &str) -> &str {
    netlist_name.strip_prefix('\\').unwrap_or(netlist_name)
}
