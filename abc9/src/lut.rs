//! Truth table rewrites used when absorbing inverters into lookup tables.

use boxsplice_netlist::{Const, State};

/// Returns the mask of a table computing the same function as `mask`, but with the input at
/// `index` inverted before lookup.
pub fn invert_input(mask: &Const, index: usize) -> Const {
    let mut mask = mask.clone();
    let stride = 1 << index;
    let mut base = 0;
    while base + stride < mask.len() {
        for offset in 0..stride {
            let (lo, hi) = (mask[base + offset], mask[base + offset + stride]);
            mask[base + offset] = hi;
            mask[base + offset + stride] = lo;
        }
        base += stride << 1;
    }
    mask
}

/// Returns the mask of a table computing the complement of `mask`.
pub fn invert_output(mask: &Const) -> Const {
    mask.complement()
}

/// Evaluates a table for the given input values, least significant input first.
pub fn lookup(mask: &Const, inputs: impl IntoIterator<Item = bool>) -> Option<bool> {
    let index = inputs.into_iter().enumerate().fold(0, |acc, (bit, value)| acc | ((value as usize) << bit));
    match mask.iter().nth(index)? {
        State::Zero => Some(false),
        State::One => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use boxsplice_netlist::Const;

    use super::{invert_input, invert_output, lookup};

    #[test]
    fn test_invert_input() {
        // a & !b
        let mask = Const::lit("0010");
        assert_eq!(invert_input(&mask, 0), Const::lit("0001"));
        assert_eq!(invert_input(&mask, 1), Const::lit("1000"));
        assert_eq!(invert_input(&invert_input(&mask, 1), 1), mask);
    }

    #[test]
    fn test_invert_input_is_function_preserving() {
        let mask = Const::lit("1001011001101001");
        for index in 0..4 {
            let inverted = invert_input(&mask, index);
            for value in 0..16usize {
                let bits = (0..4).map(|bit| value & (1 << bit) != 0).collect::<Vec<_>>();
                let mut flipped = bits.clone();
                flipped[index] = !flipped[index];
                assert_eq!(lookup(&inverted, flipped), lookup(&mask, bits));
            }
        }
    }

    #[test]
    fn test_invert_output() {
        assert_eq!(invert_output(&Const::lit("0110")), Const::lit("1001"));
        assert_eq!(lookup(&Const::lit("01"), [false]), Some(true));
        assert_eq!(lookup(&Const::lit("01"), [true]), Some(false));
    }
}
