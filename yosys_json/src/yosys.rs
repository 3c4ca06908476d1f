use indexmap::IndexMap;
use jzon::{object, JsonValue};

use boxsplice_netlist::{Const, ParamValue, State};

#[derive(Debug)]
pub struct SyntaxError(JsonValue);

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "syntax error near: {}", self.0)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Zero,
    One,
    Undef,
    HiZ,
    Net(usize),
}

impl TryFrom<JsonValue> for Bit {
    type Error = SyntaxError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some("0") => Ok(Self::Zero),
            Some("1") => Ok(Self::One),
            Some("x") => Ok(Self::Undef),
            Some("z") => Ok(Self::HiZ),
            Some(_) => Err(SyntaxError(value)),
            None => match value.as_usize() {
                Some(index) => Ok(Bit::Net(index)),
                None => Err(SyntaxError(value)),
            },
        }
    }
}

impl From<Bit> for JsonValue {
    fn from(value: Bit) -> Self {
        match value {
            Bit::Zero => "0".into(),
            Bit::One => "1".into(),
            Bit::Undef => "x".into(),
            Bit::HiZ => "z".into(),
            Bit::Net(index) => index.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BitVector(pub Vec<Bit>);

impl BitVector {
    pub fn iter(&self) -> std::slice::Iter<'_, Bit> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl TryFrom<JsonValue> for BitVector {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        if value.is_array() {
            let mut bits = vec![];
            for bit_value in value.members_mut() {
                bits.push(Bit::try_from(bit_value.take())?);
            }
            Ok(BitVector(bits))
        } else {
            Err(SyntaxError(value))
        }
    }
}

impl From<BitVector> for JsonValue {
    fn from(value: BitVector) -> JsonValue {
        JsonValue::Array(value.0.iter().copied().map(JsonValue::from).collect::<Vec<_>>())
    }
}

/// Attribute or parameter value. Yosys writes integers as bit strings and marks text that could
/// be mistaken for a bit string with a trailing space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    String(String),
    Const(Const),
}

impl From<&ParamValue> for MetadataValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Const(value) => MetadataValue::Const(value.clone()),
            ParamValue::Int(value) => MetadataValue::Const(Const::from_int(*value, 32)),
            ParamValue::String(value) => MetadataValue::String(value.clone()),
        }
    }
}

impl From<MetadataValue> for ParamValue {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Const(value) => ParamValue::Const(value),
            MetadataValue::String(value) => ParamValue::String(value),
        }
    }
}

enum MetadataValueClass {
    Bits,
    BitsAndSpaces,
    Other,
}

impl MetadataValueClass {
    fn compute(value: &str) -> MetadataValueClass {
        let mut class = MetadataValueClass::Bits;
        for char in value.chars() {
            match (&class, char) {
                (MetadataValueClass::Bits, '0' | '1' | 'x' | 'z') => (),
                (MetadataValueClass::BitsAndSpaces, ' ') => (),
                (MetadataValueClass::Bits, ' ') => class = MetadataValueClass::BitsAndSpaces,
                _ => class = MetadataValueClass::Other,
            }
        }
        class
    }
}

impl TryFrom<JsonValue> for MetadataValue {
    type Error = SyntaxError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        let Some(text) = value.as_str() else {
            return Err(SyntaxError(value));
        };
        Ok(match MetadataValueClass::compute(text) {
            MetadataValueClass::Bits => match text.parse::<Const>() {
                Ok(value) => MetadataValue::Const(value),
                Err(()) => MetadataValue::String(text.to_owned()),
            },
            MetadataValueClass::BitsAndSpaces => {
                MetadataValue::String(text.strip_suffix(' ').unwrap_or(text).to_owned())
            }
            MetadataValueClass::Other => MetadataValue::String(text.to_owned()),
        })
    }
}

impl From<MetadataValue> for JsonValue {
    fn from(value: MetadataValue) -> JsonValue {
        match value {
            MetadataValue::String(value) => match MetadataValueClass::compute(&value) {
                MetadataValueClass::Bits | MetadataValueClass::BitsAndSpaces => (value + " ").into(),
                MetadataValueClass::Other => value.into(),
            },
            MetadataValue::Const(value) => {
                value.iter().rev().map(State::to_char).collect::<String>().into()
            }
        }
    }
}

/// A JSON object with its key order preserved; port order is significant.
#[derive(Debug)]
pub struct Map<V>(pub IndexMap<String, V>);

impl<V> Map<V> {
    pub fn new() -> Map<V> {
        Map(IndexMap::new())
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, V> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.get(key)
    }

    pub fn add(&mut self, key: &str, value: V) {
        self.0.insert(key.to_owned(), value);
    }
}

impl<V: TryFrom<JsonValue, Error = SyntaxError>> TryFrom<JsonValue> for Map<V> {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        if value.is_object() {
            let mut entries = IndexMap::new();
            for (name, value) in value.entries_mut() {
                entries.insert(name.to_owned(), value.take().try_into()?);
            }
            Ok(Map(entries))
        } else if value.is_null() {
            Ok(Map::new())
        } else {
            Err(SyntaxError(value))
        }
    }
}

impl<V: Into<JsonValue>> From<Map<V>> for JsonValue {
    fn from(value: Map<V>) -> JsonValue {
        let mut object = jzon::object::Object::new();
        for (name, value) in value.0 {
            object.insert(&name, value.into());
        }
        JsonValue::Object(object)
    }
}

pub type Metadata = Map<MetadataValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

impl TryFrom<JsonValue> for PortDirection {
    type Error = SyntaxError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some("input") => Ok(PortDirection::Input),
            Some("output") => Ok(PortDirection::Output),
            Some("inout") => Ok(PortDirection::Inout),
            _ => Err(SyntaxError(value)),
        }
    }
}

impl From<PortDirection> for JsonValue {
    fn from(value: PortDirection) -> JsonValue {
        match value {
            PortDirection::Input => "input".into(),
            PortDirection::Output => "output".into(),
            PortDirection::Inout => "inout".into(),
        }
    }
}

#[derive(Debug)]
pub struct PortDetails {
    pub direction: PortDirection,
    pub bits: BitVector,
}

impl TryFrom<JsonValue> for PortDetails {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        let direction = PortDirection::try_from(value["direction"].take())?;
        let bits = BitVector::try_from(value["bits"].take())?;
        Ok(PortDetails { direction, bits })
    }
}

impl From<PortDetails> for JsonValue {
    fn from(value: PortDetails) -> JsonValue {
        object! {
            direction: value.direction,
            bits: value.bits,
        }
    }
}

#[derive(Debug)]
pub struct CellDetails {
    pub hide_name: bool,
    pub type_: String,
    pub parameters: Metadata,
    pub attributes: Metadata,
    pub port_directions: Map<PortDirection>,
    pub connections: Map<BitVector>,
}

impl TryFrom<JsonValue> for CellDetails {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        let hide_name = value["hide_name"].as_usize().unwrap_or(0) != 0;
        let type_ = value["type"].as_str().map(|s| s.to_owned()).ok_or(SyntaxError(value["type"].take()))?;
        let parameters = Metadata::try_from(value["parameters"].take())?;
        let attributes = Metadata::try_from(value["attributes"].take())?;
        let port_directions = Map::<PortDirection>::try_from(value["port_directions"].take())?;
        let connections = Map::<BitVector>::try_from(value["connections"].take())?;
        Ok(CellDetails { hide_name, type_, parameters, attributes, port_directions, connections })
    }
}

impl From<CellDetails> for JsonValue {
    fn from(value: CellDetails) -> JsonValue {
        object! {
            hide_name: if value.hide_name { 1 } else { 0 },
            type: value.type_,
            parameters: value.parameters,
            attributes: value.attributes,
            port_directions: value.port_directions,
            connections: value.connections,
        }
    }
}

#[derive(Debug)]
pub struct NetDetails {
    pub hide_name: bool,
    pub attributes: Metadata,
    pub bits: BitVector,
}

impl TryFrom<JsonValue> for NetDetails {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        let hide_name = value["hide_name"].as_usize().unwrap_or(0) != 0;
        let attributes = Metadata::try_from(value["attributes"].take())?;
        let bits = BitVector::try_from(value["bits"].take())?;
        Ok(NetDetails { hide_name, attributes, bits })
    }
}

impl From<NetDetails> for JsonValue {
    fn from(value: NetDetails) -> JsonValue {
        object! {
            hide_name: if value.hide_name { 1 } else { 0 },
            attributes: value.attributes,
            bits: value.bits,
        }
    }
}

#[derive(Debug)]
pub struct Module {
    pub attributes: Metadata,
    pub parameter_default_values: Metadata,
    pub ports: Map<PortDetails>,
    pub cells: Map<CellDetails>,
    pub netnames: Map<NetDetails>,
}

impl TryFrom<JsonValue> for Module {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        let attributes = Metadata::try_from(value["attributes"].take())?;
        let parameter_default_values = Metadata::try_from(value["parameter_default_values"].take())?;
        let ports = Map::<PortDetails>::try_from(value["ports"].take())?;
        let cells = Map::<CellDetails>::try_from(value["cells"].take())?;
        let netnames = Map::<NetDetails>::try_from(value["netnames"].take())?;
        Ok(Module { attributes, parameter_default_values, ports, cells, netnames })
    }
}

impl From<Module> for JsonValue {
    fn from(value: Module) -> JsonValue {
        object! {
            attributes: value.attributes,
            parameter_default_values: value.parameter_default_values,
            ports: value.ports,
            cells: value.cells,
            netnames: value.netnames,
        }
    }
}

#[derive(Debug)]
pub struct Design {
    pub creator: String,
    pub modules: Map<Module>,
}

impl TryFrom<JsonValue> for Design {
    type Error = SyntaxError;

    fn try_from(mut value: JsonValue) -> Result<Self, Self::Error> {
        let creator = value["creator"].as_str().unwrap_or("").to_owned();
        let modules = Map::<Module>::try_from(value["modules"].take())?;
        Ok(Design { creator, modules })
    }
}

impl From<Design> for JsonValue {
    fn from(value: Design) -> JsonValue {
        object! {
            creator: value.creator,
            modules: value.modules,
        }
    }
}
