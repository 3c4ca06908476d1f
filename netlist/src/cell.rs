use std::borrow::Cow;
use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::{CellAttrs, Const, ParamValue, SigBit, SigSpec, State};

/// Port and parameter names of the built-in cell types.
pub mod id {
    pub const A: &str = "\\A";
    pub const B: &str = "\\B";
    pub const S: &str = "\\S";
    pub const Y: &str = "\\Y";
    pub const C: &str = "\\C";
    pub const D: &str = "\\D";
    pub const Q: &str = "\\Q";
    pub const R: &str = "\\R";
    pub const I: &str = "\\I";
    pub const O: &str = "\\O";
    /// Flattened box inputs, as referenced by the mapped module.
    pub const BOX_I: &str = "\\i";
    /// Flattened box outputs, as referenced by the mapped module.
    pub const BOX_O: &str = "\\o";
    pub const LUT: &str = "\\LUT";
    pub const WIDTH: &str = "\\WIDTH";
    pub const DELAY: &str = "\\DELAY";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

/// Clock polarity and asynchronous reset flavor of a fine-grained flip-flop.
///
/// The first letter is the clock polarity, the second (if any) the reset polarity, and the
/// digit the value the reset loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DffKind {
    P,
    N,
    PP0,
    PP1,
    PN0,
    PN1,
    NP0,
    NP1,
    NN0,
    NN1,
}

impl DffKind {
    const ALL: [DffKind; 10] = [
        DffKind::P,
        DffKind::N,
        DffKind::PP0,
        DffKind::PP1,
        DffKind::PN0,
        DffKind::PN1,
        DffKind::NP0,
        DffKind::NP1,
        DffKind::NN0,
        DffKind::NN1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DffKind::P => "$_DFF_P_",
            DffKind::N => "$_DFF_N_",
            DffKind::PP0 => "$_DFF_PP0_",
            DffKind::PP1 => "$_DFF_PP1_",
            DffKind::PN0 => "$_DFF_PN0_",
            DffKind::PN1 => "$_DFF_PN1_",
            DffKind::NP0 => "$_DFF_NP0_",
            DffKind::NP1 => "$_DFF_NP1_",
            DffKind::NN0 => "$_DFF_NN0_",
            DffKind::NN1 => "$_DFF_NN1_",
        }
    }

    fn from_name(name: &str) -> Option<DffKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Reset polarity (`true` for active high) and reset value, for the resettable variants.
    pub fn reset(self) -> Option<(bool, State)> {
        match self {
            DffKind::P | DffKind::N => None,
            DffKind::PP0 | DffKind::NP0 => Some((true, State::Zero)),
            DffKind::PP1 | DffKind::NP1 => Some((true, State::One)),
            DffKind::PN0 | DffKind::NN0 => Some((false, State::Zero)),
            DffKind::PN1 | DffKind::NN1 => Some((false, State::One)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellType {
    And,
    Or,
    Xor,
    Not,
    Buf,
    Mux,
    Lut,
    Dff(DffKind),
    /// Sequential placeholder standing in for a register while the mapper runs.
    Ff,
    /// Delay placeholder carrying a required time as its `DELAY` parameter.
    Delay,
    /// Reference to another module (or to a type unknown to this crate).
    Instance(String),
}

impl CellType {
    pub fn from_name(name: &str) -> CellType {
        match name {
            "$_AND_" => CellType::And,
            "$_OR_" => CellType::Or,
            "$_XOR_" => CellType::Xor,
            "$_NOT_" => CellType::Not,
            "$_BUF_" => CellType::Buf,
            "$_MUX_" => CellType::Mux,
            "$lut" => CellType::Lut,
            "$__ABC9_FF_" => CellType::Ff,
            "$__ABC9_DELAY" => CellType::Delay,
            _ => match DffKind::from_name(name) {
                Some(kind) => CellType::Dff(kind),
                None => CellType::Instance(name.to_owned()),
            },
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        match self {
            CellType::And => "$_AND_".into(),
            CellType::Or => "$_OR_".into(),
            CellType::Xor => "$_XOR_".into(),
            CellType::Not => "$_NOT_".into(),
            CellType::Buf => "$_BUF_".into(),
            CellType::Mux => "$_MUX_".into(),
            CellType::Lut => "$lut".into(),
            CellType::Dff(kind) => kind.name().into(),
            CellType::Ff => "$__ABC9_FF_".into(),
            CellType::Delay => "$__ABC9_DELAY".into(),
            CellType::Instance(name) => name.as_str().into(),
        }
    }

    /// Single-output combinational gates.
    pub fn is_gate(&self) -> bool {
        matches!(self, CellType::And | CellType::Or | CellType::Xor | CellType::Not | CellType::Buf | CellType::Mux)
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, CellType::Instance(_))
    }

    pub fn instance_of(&self) -> Option<&str> {
        match self {
            CellType::Instance(name) => Some(name),
            _ => None,
        }
    }

    /// Direction of a port of a built-in cell type; `None` for instances and unknown ports.
    pub fn builtin_direction(&self, port: &str) -> Option<PortDirection> {
        let inputs: &[&str] = match self {
            CellType::And | CellType::Or | CellType::Xor => &[id::A, id::B],
            CellType::Not | CellType::Buf | CellType::Lut => &[id::A],
            CellType::Mux => &[id::A, id::B, id::S],
            CellType::Dff(_) => &[id::C, id::D, id::R],
            CellType::Ff => &[id::D],
            CellType::Delay => &[id::I],
            CellType::Instance(_) => return None,
        };
        let output = match self {
            CellType::Dff(_) | CellType::Ff => id::Q,
            CellType::Delay => id::O,
            _ => id::Y,
        };
        if inputs.contains(&port) {
            Some(PortDirection::Input)
        } else if port == output {
            Some(PortDirection::Output)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub type_: CellType,
    pub parameters: BTreeMap<String, ParamValue>,
    pub attrs: CellAttrs,
    pub connections: IndexMap<String, SigSpec>,
}

impl Cell {
    pub fn new(type_: CellType) -> Cell {
        Cell { type_, parameters: BTreeMap::new(), attrs: CellAttrs::default(), connections: IndexMap::new() }
    }

    pub fn lut(inputs: SigSpec, output: SigBit, mask: Const) -> Cell {
        debug_assert_eq!(mask.len(), 1 << inputs.len());
        Cell::new(CellType::Lut)
            .with_param(id::WIDTH, ParamValue::Int(inputs.len() as i64))
            .with_param(id::LUT, mask)
            .with_port(id::A, inputs)
            .with_port(id::Y, output)
    }

    /// `Y = S ? B : A`
    pub fn mux(a: SigBit, b: SigBit, s: SigBit, y: SigBit) -> Cell {
        Cell::new(CellType::Mux).with_port(id::A, a).with_port(id::B, b).with_port(id::S, s).with_port(id::Y, y)
    }

    pub fn delay(input: SigBit, output: SigBit, delay: i64) -> Cell {
        Cell::new(CellType::Delay).with_param(id::DELAY, ParamValue::Int(delay)).with_port(id::I, input).with_port(id::O, output)
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Cell {
        self.parameters.insert(name.to_owned(), value.into());
        self
    }

    pub fn with_port(mut self, name: &str, signal: impl Into<SigSpec>) -> Cell {
        self.connections.insert(name.to_owned(), signal.into());
        self
    }

    pub fn port(&self, name: &str) -> Option<&SigSpec> {
        self.connections.get(name)
    }

    pub fn port_bit(&self, name: &str) -> Option<SigBit> {
        self.port(name).and_then(SigSpec::as_bit)
    }

    pub fn set_port(&mut self, name: &str, signal: impl Into<SigSpec>) {
        self.connections.insert(name.to_owned(), signal.into());
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    /// Truth table of a `$lut` cell, least significant entry first.
    pub fn lut_mask(&self) -> Option<Const> {
        self.param(id::LUT).and_then(ParamValue::as_const)
    }
}
