//! This library provides the in-memory form of a hierarchical, bit-level netlist in the style of
//! Yosys RTLIL.
//!
//! A [`Design`] owns named [`Module`]s. Each module owns an arena of [`Wire`]s, an ordered set of
//! [`Cell`]s, and a list of connections between [`SigSpec`]s. Bit identity is a ([`WireId`],
//! offset) pair; there is no implicit aliasing between wires other than through explicit
//! connections, which a [`SigMap`] resolves.

mod logic;
mod sigspec;
mod param;
mod attrs;
mod cell;
mod module;
mod design;
mod sigmap;
mod print;
mod parse;

pub use logic::{State, Const};
pub use sigspec::{WireId, SigBit, SigSpec};
pub use param::ParamValue;
pub use attrs::{Attributes, ModuleAttrs, WireAttrs, CellAttrs, Timing, TimingError};
pub use cell::{Cell, CellType, DffKind, PortDirection, id};
pub use module::{Module, Wire, NameConflict};
pub use design::Design;
pub use sigmap::SigMap;
pub use parse::{parse, ParseError};
