use std::collections::BTreeMap;

use crate::{Module, SigBit, SigSpec};

/// Maps every bit to a canonical representative of the set of bits it is connected to.
///
/// If a set contains a constant, the constant is its representative.
#[derive(Debug, Clone, Default)]
pub struct SigMap {
    parent: BTreeMap<SigBit, SigBit>,
}

impl SigMap {
    pub fn new(module: &Module) -> SigMap {
        let mut sigmap = SigMap::default();
        for (lhs, rhs) in &module.connections {
            for (lhs_bit, rhs_bit) in lhs.iter().zip(rhs.iter()) {
                sigmap.add(lhs_bit, rhs_bit);
            }
        }
        sigmap
    }

    fn find(&self, mut bit: SigBit) -> SigBit {
        while let Some(&parent) = self.parent.get(&bit) {
            bit = parent;
        }
        bit
    }

    /// Records that `lhs` and `rhs` carry the same value.
    pub fn add(&mut self, lhs: SigBit, rhs: SigBit) {
        let (lhs_root, rhs_root) = (self.find(lhs), self.find(rhs));
        if lhs_root == rhs_root {
            return;
        }
        match (lhs_root.is_const(), rhs_root.is_const()) {
            (true, true) => (),
            (true, false) => {
                self.parent.insert(rhs_root, lhs_root);
            }
            (false, _) => {
                self.parent.insert(lhs_root, rhs_root);
            }
        }
    }

    pub fn bit(&self, bit: SigBit) -> SigBit {
        self.find(bit)
    }

    pub fn sig(&self, sig: &SigSpec) -> SigSpec {
        sig.map(|bit| self.find(bit))
    }
}

#[cfg(test)]
mod test {
    use super::SigMap;
    use crate::{Module, SigBit, SigSpec, State, Wire};

    #[test]
    fn test_const_is_representative() {
        let mut module = Module::new("\\top");
        let a = module.add_wire(Wire::new("\\a", 1)).unwrap();
        let b = module.add_wire(Wire::new("\\b", 1)).unwrap();
        let c = module.add_wire(Wire::new("\\c", 1)).unwrap();
        module.connect(module.sig(a), module.sig(b));
        module.connect(module.sig(b), SigSpec::from(State::Zero));
        let sigmap = SigMap::new(&module);
        assert_eq!(sigmap.bit(SigBit::Wire(a, 0)), SigBit::ZERO);
        assert_eq!(sigmap.bit(SigBit::Wire(b, 0)), SigBit::ZERO);
        assert_eq!(sigmap.bit(SigBit::Wire(c, 0)), SigBit::Wire(c, 0));
    }

    #[test]
    fn test_driver_is_representative() {
        let mut module = Module::new("\\top");
        let a = module.add_wire(Wire::new("\\a", 2)).unwrap();
        let b = module.add_wire(Wire::new("\\b", 2)).unwrap();
        module.connect(module.sig(a), module.sig(b));
        let sigmap = SigMap::new(&module);
        assert_eq!(sigmap.sig(&module.sig(a)), module.sig(b));
    }
}
