use std::{
    fmt::{Debug, Display},
    ops::{Index, IndexMut},
    str::FromStr,
};

/// A single bit of a constant: zero, one, undefined (`x`), or high impedance (`z`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    Zero,
    One,
    Undef,
    HiZ,
}

impl State {
    pub fn from_char(chr: char) -> Result<Self, ()> {
        match chr {
            '0' => Ok(State::Zero),
            '1' => Ok(State::One),
            'x' | 'X' | '-' => Ok(State::Undef),
            'z' | 'Z' => Ok(State::HiZ),
            _ => Err(()),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            State::Zero => '0',
            State::One => '1',
            State::Undef => 'x',
            State::HiZ => 'z',
        }
    }

    pub fn is_def(self) -> bool {
        matches!(self, State::Zero | State::One)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        if value { State::One } else { State::Zero }
    }
}

impl std::ops::Not for State {
    type Output = State;

    fn not(self) -> Self::Output {
        match self {
            State::Zero => State::One,
            State::One => State::Zero,
            State::Undef | State::HiZ => State::Undef,
        }
    }
}

/// A constant bit vector, stored least significant bit first.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Const {
    bits: Vec<State>,
}

impl Const {
    pub fn new() -> Self {
        Const { bits: vec![] }
    }

    pub fn repeat(state: State, width: usize) -> Self {
        Const { bits: vec![state; width] }
    }

    pub fn zero(width: usize) -> Self {
        Self::repeat(State::Zero, width)
    }

    /// Two's complement encoding of `value`, truncated or sign-extended to `width` bits.
    pub fn from_int(value: i64, width: usize) -> Self {
        Const::from_iter((0..width).map(|index| {
            let bit = if index < 64 { (value >> index) & 1 } else { (value >> 63) & 1 };
            State::from(bit != 0)
        }))
    }

    /// Parses a most-significant-bit-first literal such as `"0110"`.
    ///
    /// Panics on characters other than `0`, `1`, `x`, `z`; intended for constants in code.
    pub fn lit(value: &str) -> Self {
        value.parse().expect("invalid constant literal")
    }

    /// Integer value of the low 32 bits; a 32-bit (or wider) constant is read as signed.
    pub fn as_int(&self) -> Option<i64> {
        let mut value = 0u32;
        for (index, state) in self.bits.iter().take(32).enumerate() {
            match state {
                State::One => value |= 1 << index,
                State::Zero => (),
                State::Undef | State::HiZ => return None,
            }
        }
        if self.bits.len() >= 32 { Some(value as i32 as i64) } else { Some(value as i64) }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = State> + ExactSizeIterator + '_ {
        self.bits.iter().copied()
    }

    pub fn push(&mut self, state: State) {
        self.bits.push(state);
    }

    pub fn is_fully_def(&self) -> bool {
        self.bits.iter().all(|state| state.is_def())
    }

    /// Inverts every defined bit; undefined bits stay undefined.
    pub fn complement(&self) -> Self {
        Const::from_iter(self.iter().map(|state| !state))
    }
}

impl Debug for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Const::lit(\"{self}\")")
    }
}

impl Display for Const {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for state in self.bits.iter().rev() {
            write!(f, "{state}")?;
        }
        Ok(())
    }
}

impl FromStr for Const {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = vec![];
        for chr in s.chars().rev() {
            bits.push(State::from_char(chr)?);
        }
        Ok(Const { bits })
    }
}

impl From<State> for Const {
    fn from(value: State) -> Self {
        Const { bits: vec![value] }
    }
}

impl From<Vec<State>> for Const {
    fn from(bits: Vec<State>) -> Self {
        Const { bits }
    }
}

impl FromIterator<State> for Const {
    fn from_iter<T: IntoIterator<Item = State>>(iter: T) -> Self {
        Const { bits: iter.into_iter().collect() }
    }
}

impl Index<usize> for Const {
    type Output = State;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bits[index]
    }
}

impl IndexMut<usize> for Const {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bits[index]
    }
}

impl<'a> IntoIterator for &'a Const {
    type Item = State;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, State>>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.iter().copied()
    }
}

#[cfg(test)]
mod test {
    use super::{Const, State};

    #[test]
    fn test_lit_is_msb_first() {
        let value = Const::lit("10x");
        assert_eq!(value.len(), 3);
        assert_eq!(value[0], State::Undef);
        assert_eq!(value[1], State::Zero);
        assert_eq!(value[2], State::One);
        assert_eq!(value.to_string(), "10x");
    }

    #[test]
    fn test_int_conversion() {
        assert_eq!(Const::from_int(5, 4), Const::lit("0101"));
        assert_eq!(Const::from_int(5, 4).as_int(), Some(5));
        assert_eq!(Const::from_int(-1, 32).as_int(), Some(-1));
        assert_eq!(Const::from_int(9000, 32).as_int(), Some(9000));
        assert_eq!(Const::lit("1x").as_int(), None);
    }

    #[test]
    fn test_complement() {
        assert_eq!(Const::lit("0110").complement(), Const::lit("1001"));
        assert_eq!(Const::lit("x1").complement(), Const::lit("x0"));
    }
}
