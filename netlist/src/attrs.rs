//! Typed attributes for modules, wires, and cells.
//!
//! File formats carry attributes as a flat name/value map. Every attribute this crate gives a
//! meaning to is decoded into a typed field by [`Attributes::insert_raw`]; anything else (or a
//! known name with an undecodable value) is kept verbatim in `other` so that it survives a round
//! trip unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::{Const, ParamValue};

pub(crate) mod name {
    pub const BOX_ID: &str = "\\abc9_box_id";
    pub const WHITEBOX: &str = "\\whitebox";
    pub const BLACKBOX: &str = "\\blackbox";
    pub const FLOP: &str = "\\abc9_flop";
    pub const HOLES: &str = "\\abc9_holes";
    pub const DELAYS: &str = "\\abc9_delays";
    pub const KEEP: &str = "\\keep";
    pub const CARRY: &str = "\\abc9_carry";
    pub const ARRIVAL: &str = "\\abc9_arrival";
    pub const REQUIRED: &str = "\\abc9_required";
    pub const SCC_ID: &str = "\\abc9_scc_id";
    pub const BOX_SEQ: &str = "\\abc9_box_seq";
    pub const MERGEABILITY: &str = "\\abc9_mergeability";
    pub const INIT: &str = "\\abc9_init";
}

/// Conversion between typed attribute fields and their serialized name/value form.
pub trait Attributes: Default {
    /// Stores one serialized attribute, decoding it if the name is known.
    fn insert_raw(&mut self, name: &str, value: ParamValue);

    /// All attributes in serialized form: known attributes first, then the rest by name.
    fn to_raw(&self) -> Vec<(String, ParamValue)>;

    fn from_raw(entries: impl IntoIterator<Item = (String, ParamValue)>) -> Self {
        let mut attrs = Self::default();
        for (name, value) in entries {
            attrs.insert_raw(&name, value);
        }
        attrs
    }
}

fn decode_flag(slot: &mut bool, other: &mut BTreeMap<String, ParamValue>, name: &str, value: ParamValue) {
    match value.as_bool() {
        Some(flag) => *slot = flag,
        None => {
            other.insert(name.to_owned(), value);
        }
    }
}

fn decode_int(slot: &mut Option<i64>, other: &mut BTreeMap<String, ParamValue>, name: &str, value: ParamValue) {
    match value.as_int() {
        Some(int) => *slot = Some(int),
        None => {
            other.insert(name.to_owned(), value);
        }
    }
}

fn encode_flag(entries: &mut Vec<(String, ParamValue)>, name: &str, flag: bool) {
    if flag {
        entries.push((name.to_owned(), ParamValue::Int(1)));
    }
}

fn encode_int(entries: &mut Vec<(String, ParamValue)>, name: &str, value: Option<i64>) {
    if let Some(value) = value {
        entries.push((name.to_owned(), ParamValue::Int(value)));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    NonInteger(String),
    Negative(String),
}

impl Display for TimingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingError::NonInteger(token) => write!(f, "non-integer value '{token}'"),
            TimingError::Negative(token) => write!(f, "negative value {token}"),
        }
    }
}

/// A timing annotation on a port: one integer for every bit, or one integer per bit.
///
/// Lists are kept in their textual form so that malformed annotations can be reported by the
/// validator instead of being rejected when the design is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timing {
    Int(i64),
    List(String),
}

impl Timing {
    pub fn values(&self) -> Result<Vec<i64>, TimingError> {
        match self {
            Timing::Int(value) if *value < 0 => Err(TimingError::Negative(value.to_string())),
            Timing::Int(value) => Ok(vec![*value]),
            Timing::List(text) => {
                let mut values = vec![];
                for token in text.split_whitespace() {
                    if !token.chars().all(|chr| chr.is_ascii_digit()) {
                        return Err(TimingError::NonInteger(token.to_owned()));
                    }
                    values.push(token.parse::<i64>().map_err(|_| TimingError::NonInteger(token.to_owned()))?);
                }
                Ok(values)
            }
        }
    }

    /// Values expanded to one per bit. A single value applies to every bit; a list is returned
    /// as is, and it is the caller's responsibility to check it against `width`.
    pub fn per_bit(&self, width: usize) -> Result<Vec<i64>, TimingError> {
        let values = self.values()?;
        if values.len() == 1 { Ok(vec![values[0]; width]) } else { Ok(values) }
    }

    fn decode(value: ParamValue) -> Result<Timing, ParamValue> {
        match value {
            ParamValue::String(text) => Ok(Timing::List(text)),
            value => value.as_int().map(Timing::Int).ok_or(value),
        }
    }

    fn encode(&self) -> ParamValue {
        match self {
            Timing::Int(value) => ParamValue::Int(*value),
            Timing::List(text) => ParamValue::String(text.clone()),
        }
    }
}

impl Display for Timing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timing::Int(value) => write!(f, "{value}"),
            Timing::List(text) => write!(f, "\"{text}\""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleAttrs {
    /// Box identifier the mapper knows this type by.
    pub box_id: Option<i64>,
    pub whitebox: bool,
    pub blackbox: bool,
    /// Register macro: a box whose single output is a storage element.
    pub flop: bool,
    /// Marks the scratch network built by boundary extraction.
    pub holes: bool,
    /// Distinct delay values of the placeholders inserted into this module.
    pub delays: Option<BTreeSet<i64>>,
    pub other: BTreeMap<String, ParamValue>,
}

impl ModuleAttrs {
    /// Whether the module's contents are not part of the design proper (black or white box).
    pub fn is_box_like(&self) -> bool {
        self.blackbox || self.whitebox
    }
}

impl Attributes for ModuleAttrs {
    fn insert_raw(&mut self, attr: &str, value: ParamValue) {
        match attr {
            name::BOX_ID => decode_int(&mut self.box_id, &mut self.other, attr, value),
            name::WHITEBOX => decode_flag(&mut self.whitebox, &mut self.other, attr, value),
            name::BLACKBOX => decode_flag(&mut self.blackbox, &mut self.other, attr, value),
            name::FLOP => decode_flag(&mut self.flop, &mut self.other, attr, value),
            name::HOLES => decode_flag(&mut self.holes, &mut self.other, attr, value),
            name::DELAYS => {
                let parsed = value
                    .as_str()
                    .and_then(|text| text.split_whitespace().map(|token| token.parse().ok()).collect::<Option<_>>());
                match parsed {
                    Some(delays) => self.delays = Some(delays),
                    None => {
                        self.other.insert(attr.to_owned(), value);
                    }
                }
            }
            _ => {
                self.other.insert(attr.to_owned(), value);
            }
        }
    }

    fn to_raw(&self) -> Vec<(String, ParamValue)> {
        let mut entries = vec![];
        encode_int(&mut entries, name::BOX_ID, self.box_id);
        encode_flag(&mut entries, name::WHITEBOX, self.whitebox);
        encode_flag(&mut entries, name::BLACKBOX, self.blackbox);
        encode_flag(&mut entries, name::FLOP, self.flop);
        encode_flag(&mut entries, name::HOLES, self.holes);
        if let Some(delays) = &self.delays {
            let text = delays.iter().map(|delay| delay.to_string()).collect::<Vec<_>>().join(" ");
            entries.push((name::DELAYS.to_owned(), ParamValue::String(text)));
        }
        entries.extend(self.other.iter().map(|(name, value)| (name.clone(), value.clone())));
        entries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireAttrs {
    pub keep: bool,
    /// Carry chain port; whether it is the carry input or output follows from the port direction.
    pub carry: bool,
    pub arrival: Option<Timing>,
    pub required: Option<Timing>,
    /// Set on wires cut by SCC marking; cleared on reintegration.
    pub scc_id: Option<i64>,
    pub other: BTreeMap<String, ParamValue>,
}

impl WireAttrs {
    pub fn is_scc_cut(&self) -> bool {
        self.keep && self.scc_id.is_some()
    }
}

impl Attributes for WireAttrs {
    fn insert_raw(&mut self, attr: &str, value: ParamValue) {
        match attr {
            name::KEEP => decode_flag(&mut self.keep, &mut self.other, attr, value),
            name::CARRY => decode_flag(&mut self.carry, &mut self.other, attr, value),
            name::SCC_ID => decode_int(&mut self.scc_id, &mut self.other, attr, value),
            name::ARRIVAL | name::REQUIRED => {
                let slot = if attr == name::ARRIVAL { &mut self.arrival } else { &mut self.required };
                match Timing::decode(value) {
                    Ok(timing) => *slot = Some(timing),
                    Err(value) => {
                        self.other.insert(attr.to_owned(), value);
                    }
                }
            }
            _ => {
                self.other.insert(attr.to_owned(), value);
            }
        }
    }

    fn to_raw(&self) -> Vec<(String, ParamValue)> {
        let mut entries = vec![];
        encode_flag(&mut entries, name::KEEP, self.keep);
        encode_flag(&mut entries, name::CARRY, self.carry);
        if let Some(arrival) = &self.arrival {
            entries.push((name::ARRIVAL.to_owned(), arrival.encode()));
        }
        if let Some(required) = &self.required {
            entries.push((name::REQUIRED.to_owned(), required.encode()));
        }
        encode_int(&mut entries, name::SCC_ID, self.scc_id);
        entries.extend(self.other.iter().map(|(name, value)| (name.clone(), value.clone())));
        entries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellAttrs {
    pub keep: bool,
    pub scc_id: Option<i64>,
    /// Position of a box instance in the extraction order.
    pub box_seq: Option<i64>,
    /// Clock domain of a sequential placeholder; domains are numbered from 1.
    pub mergeability: Option<i64>,
    pub init: Option<Const>,
    pub other: BTreeMap<String, ParamValue>,
}

impl Attributes for CellAttrs {
    fn insert_raw(&mut self, attr: &str, value: ParamValue) {
        match attr {
            name::KEEP => decode_flag(&mut self.keep, &mut self.other, attr, value),
            name::SCC_ID => decode_int(&mut self.scc_id, &mut self.other, attr, value),
            name::BOX_SEQ => decode_int(&mut self.box_seq, &mut self.other, attr, value),
            name::MERGEABILITY => decode_int(&mut self.mergeability, &mut self.other, attr, value),
            name::INIT => match value {
                ParamValue::Const(init) => self.init = Some(init),
                value => {
                    self.other.insert(attr.to_owned(), value);
                }
            },
            _ => {
                self.other.insert(attr.to_owned(), value);
            }
        }
    }

    fn to_raw(&self) -> Vec<(String, ParamValue)> {
        let mut entries = vec![];
        encode_flag(&mut entries, name::KEEP, self.keep);
        encode_int(&mut entries, name::SCC_ID, self.scc_id);
        encode_int(&mut entries, name::BOX_SEQ, self.box_seq);
        encode_int(&mut entries, name::MERGEABILITY, self.mergeability);
        if let Some(init) = &self.init {
            entries.push((name::INIT.to_owned(), ParamValue::Const(init.clone())));
        }
        entries.extend(self.other.iter().map(|(name, value)| (name.clone(), value.clone())));
        entries
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::{Attributes, ModuleAttrs, Timing, TimingError, WireAttrs};
    use crate::{Const, ParamValue};

    #[test]
    fn test_timing_values() {
        assert_eq!(Timing::Int(3).per_bit(4), Ok(vec![3, 3, 3, 3]));
        assert_eq!(Timing::List("2 3".into()).per_bit(2), Ok(vec![2, 3]));
        assert_eq!(Timing::List("7".into()).per_bit(3), Ok(vec![7, 7, 7]));
        assert_eq!(Timing::Int(-1).values(), Err(TimingError::Negative("-1".into())));
        assert_eq!(Timing::List("1 a2".into()).values(), Err(TimingError::NonInteger("a2".into())));
        assert_eq!(Timing::List("1 -2".into()).values(), Err(TimingError::NonInteger("-2".into())));
    }

    #[test]
    fn test_module_attrs() {
        let attrs = ModuleAttrs::from_raw([
            ("\\abc9_box_id".to_owned(), ParamValue::Const(Const::from_int(7, 32))),
            ("\\whitebox".to_owned(), ParamValue::Int(1)),
            ("\\abc9_delays".to_owned(), ParamValue::String("3 2".into())),
            ("\\src".to_owned(), ParamValue::String("top.v:1".into())),
        ]);
        assert_eq!(attrs.box_id, Some(7));
        assert!(attrs.whitebox);
        assert!(!attrs.blackbox);
        assert_eq!(attrs.delays, Some(BTreeSet::from([2, 3])));
        assert_eq!(attrs.other.len(), 1);
        assert_eq!(ModuleAttrs::from_raw(attrs.to_raw()), attrs);
    }

    #[test]
    fn test_wire_attrs_keep_undecodable() {
        let attrs = WireAttrs::from_raw([
            ("\\abc9_required".to_owned(), ParamValue::String("2 3".into())),
            ("\\abc9_scc_id".to_owned(), ParamValue::String("oops".into())),
        ]);
        assert_eq!(attrs.required, Some(Timing::List("2 3".into())));
        assert_eq!(attrs.scc_id, None);
        assert!(attrs.other.contains_key("\\abc9_scc_id"));
    }
}
