use crate::{Const, State};
use std::fmt::Display;

/// Value of a cell parameter, a module parameter default, or an attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamValue {
    Const(Const),
    Int(i64),
    String(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Const(value) => value.as_int(),
            ParamValue::Int(value) => Some(*value),
            ParamValue::String(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_int().map(|value| value != 0)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Bit-level form; integers are encoded as 32-bit two's complement.
    pub fn as_const(&self) -> Option<Const> {
        match self {
            ParamValue::Const(value) => Some(value.clone()),
            ParamValue::Int(value) => Some(Const::from_int(*value, 32)),
            ParamValue::String(_) => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Int(value as i64)
    }
}

impl From<State> for ParamValue {
    fn from(value: State) -> Self {
        Self::Const(value.into())
    }
}

impl From<Const> for ParamValue {
    fn from(value: Const) -> Self {
        Self::Const(value)
    }
}

impl From<&Const> for ParamValue {
    fn from(value: &Const) -> Self {
        Self::Const(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Const(value) => write!(f, "{}'{value}", value.len()),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::String(value) => crate::print::write_string(f, value),
        }
    }
}
