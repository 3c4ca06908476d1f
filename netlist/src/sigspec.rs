use std::{
    fmt::Debug,
    ops::{Bound, Index, IndexMut, RangeBounds},
};

use crate::{Const, State};

/// Index of a wire within its module's wire arena. Wires are never removed, so a `WireId` stays
/// valid for the lifetime of the module that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(pub(crate) u32);

impl WireId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One bit of a signal: either a constant, or a single position of a wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigBit {
    Const(State),
    Wire(WireId, usize),
}

impl SigBit {
    pub const ZERO: SigBit = SigBit::Const(State::Zero);
    pub const ONE: SigBit = SigBit::Const(State::One);
    pub const UNDEF: SigBit = SigBit::Const(State::Undef);

    pub fn as_const(self) -> Option<State> {
        match self {
            SigBit::Const(state) => Some(state),
            SigBit::Wire(..) => None,
        }
    }

    pub fn wire(self) -> Option<WireId> {
        match self {
            SigBit::Const(_) => None,
            SigBit::Wire(wire, _) => Some(wire),
        }
    }

    pub fn is_const(self) -> bool {
        self.as_const().is_some()
    }
}

impl From<State> for SigBit {
    fn from(value: State) -> Self {
        SigBit::Const(value)
    }
}

impl From<bool> for SigBit {
    fn from(value: bool) -> Self {
        SigBit::Const(State::from(value))
    }
}

/// An ordered sequence of bits, least significant first.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigSpec {
    bits: Vec<SigBit>,
}

impl SigSpec {
    pub fn new() -> SigSpec {
        SigSpec { bits: vec![] }
    }

    pub fn from_wire(wire: WireId, width: usize) -> SigSpec {
        SigSpec::from_iter((0..width).map(|offset| SigBit::Wire(wire, offset)))
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = SigBit> + ExactSizeIterator + '_ {
        self.bits.iter().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SigBit> {
        self.bits.iter_mut()
    }

    pub fn push(&mut self, bit: impl Into<SigBit>) {
        self.bits.push(bit.into());
    }

    pub fn append(&mut self, other: &SigSpec) {
        self.bits.extend_from_slice(&other.bits);
    }

    pub fn concat(&self, other: &SigSpec) -> SigSpec {
        let mut result = self.clone();
        result.append(other);
        result
    }

    pub fn slice(&self, range: impl RangeBounds<usize>) -> SigSpec {
        let start = match range.start_bound() {
            Bound::Included(&index) => index,
            Bound::Excluded(&index) => index + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&index) => index + 1,
            Bound::Excluded(&index) => index,
            Bound::Unbounded => self.len(),
        };
        SigSpec { bits: self.bits[start..end].to_vec() }
    }

    /// Returns `width` bits starting at `offset`, or fewer if the signal ends first.
    pub fn extract(&self, offset: usize, width: usize) -> SigSpec {
        let start = offset.min(self.len());
        let end = (offset + width).min(self.len());
        self.slice(start..end)
    }

    pub fn as_bit(&self) -> Option<SigBit> {
        if self.len() == 1 { Some(self.bits[0]) } else { None }
    }

    pub fn is_fully_const(&self) -> bool {
        self.bits.iter().all(|bit| bit.is_const())
    }

    pub fn as_const(&self) -> Option<Const> {
        self.iter().map(SigBit::as_const).collect::<Option<Vec<_>>>().map(Const::from)
    }

    pub fn map(&self, f: impl FnMut(SigBit) -> SigBit) -> SigSpec {
        SigSpec { bits: self.iter().map(f).collect() }
    }
}

impl Debug for SigSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.bits.iter()).finish()
    }
}

impl From<SigBit> for SigSpec {
    fn from(value: SigBit) -> Self {
        SigSpec { bits: vec![value] }
    }
}

impl From<State> for SigSpec {
    fn from(value: State) -> Self {
        SigSpec::from(SigBit::from(value))
    }
}

impl From<&Const> for SigSpec {
    fn from(value: &Const) -> Self {
        SigSpec::from_iter(value.iter().map(SigBit::Const))
    }
}

impl From<Const> for SigSpec {
    fn from(value: Const) -> Self {
        SigSpec::from(&value)
    }
}

impl From<Vec<SigBit>> for SigSpec {
    fn from(bits: Vec<SigBit>) -> Self {
        SigSpec { bits }
    }
}

impl FromIterator<SigBit> for SigSpec {
    fn from_iter<T: IntoIterator<Item = SigBit>>(iter: T) -> Self {
        SigSpec { bits: iter.into_iter().collect() }
    }
}

impl Index<usize> for SigSpec {
    type Output = SigBit;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bits[index]
    }
}

impl IndexMut<usize> for SigSpec {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bits[index]
    }
}

impl<'a> IntoIterator for &'a SigSpec {
    type Item = SigBit;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, SigBit>>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.iter().copied()
    }
}

#[cfg(test)]
mod test {
    use super::{SigBit, SigSpec, WireId};
    use crate::{Const, State};

    #[test]
    fn test_slice_and_extract() {
        let sig = SigSpec::from_wire(WireId(3), 4);
        assert_eq!(sig.slice(1..3), SigSpec::from(vec![SigBit::Wire(WireId(3), 1), SigBit::Wire(WireId(3), 2)]));
        assert_eq!(sig.extract(2, 8).len(), 2);
        assert_eq!(sig.extract(6, 1).len(), 0);
        assert_eq!(sig.slice(3..).as_bit(), Some(SigBit::Wire(WireId(3), 3)));
    }

    #[test]
    fn test_const() {
        let sig = SigSpec::from(Const::lit("10"));
        assert!(sig.is_fully_const());
        assert_eq!(sig.as_const(), Some(Const::lit("10")));
        let mut mixed = sig.clone();
        mixed.push(SigBit::Wire(WireId(0), 0));
        assert!(!mixed.is_fully_const());
        assert_eq!(mixed.as_const(), None);
        assert_eq!(SigSpec::from(State::One).as_bit(), Some(SigBit::ONE));
    }
}
