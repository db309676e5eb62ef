/*
 * Gen/Kill Transfer-Function Domain
 *
 * Elements are transfer functions f(x) = (x \ kill) ∪ gen over bit sets.
 *
 * Composition (extend, "a after b"):
 *   f_a(f_b(x)) = (x \ (K_b ∪ K_a)) ∪ ((G_b \ K_a) ∪ G_a)
 *
 * Join (combine):
 *   f_a(x) ∪ f_b(x) = (x \ (K_a ∩ K_b)) ∪ (G_a ∪ G_b)
 *
 * `one` is the identity transfer (no kill, no gen); `zero` kills every bit
 * and generates none, so extending any transfer with it yields a constant
 * function independent of its input.
 */

use super::Semiring;
use fixedbitset::FixedBitSet;

/// A (kill, gen) pair of bit sets of equal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenKillTransfer {
    pub kill: FixedBitSet,
    pub gen: FixedBitSet,
}

impl GenKillTransfer {
    pub fn identity(width: usize) -> Self {
        Self {
            kill: FixedBitSet::with_capacity(width),
            gen: FixedBitSet::with_capacity(width),
        }
    }

    /// Transfer that generates a single bit and kills nothing.
    pub fn gen_bit(width: usize, bit: usize) -> Self {
        let mut t = Self::identity(width);
        t.gen.insert(bit);
        t
    }

    /// Apply this transfer to a fact set: `(fact \ kill) ∪ gen`.
    pub fn apply(&self, fact: &FixedBitSet) -> FixedBitSet {
        let mut out = fact.clone();
        out.difference_with(&self.kill);
        out.union_with(&self.gen);
        out
    }
}

/// Domain instance; carries the bit width so values stay consistent.
#[derive(Debug, Clone)]
pub struct GenKillDomain {
    width: usize,
}

impl GenKillDomain {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Semiring for GenKillDomain {
    type Value = GenKillTransfer;
    type Test = bool;

    const IDEMPOTENT: bool = true;

    fn zero(&self) -> GenKillTransfer {
        let mut kill = FixedBitSet::with_capacity(self.width);
        kill.insert_range(..);
        GenKillTransfer {
            kill,
            gen: FixedBitSet::with_capacity(self.width),
        }
    }

    fn one(&self) -> GenKillTransfer {
        GenKillTransfer::identity(self.width)
    }

    fn equal(&self, a: &GenKillTransfer, b: &GenKillTransfer) -> bool {
        a == b
    }

    fn combine(&self, a: &GenKillTransfer, b: &GenKillTransfer) -> GenKillTransfer {
        let mut kill = a.kill.clone();
        kill.intersect_with(&b.kill);
        let mut gen = a.gen.clone();
        gen.union_with(&b.gen);
        GenKillTransfer { kill, gen }
    }

    fn extend(&self, a: &GenKillTransfer, b: &GenKillTransfer) -> GenKillTransfer {
        let mut kill = b.kill.clone();
        kill.union_with(&a.kill);
        let mut gen = b.gen.clone();
        gen.difference_with(&a.kill);
        gen.union_with(&a.gen);
        GenKillTransfer { kill, gen }
    }

    fn display(&self, v: &GenKillTransfer) -> String {
        format!(
            "kill{:?} gen{:?}",
            v.kill.ones().collect::<Vec<_>>(),
            v.gen.ones().collect::<Vec<_>>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_composes_after() {
        let dom = GenKillDomain::new(4);
        // b: gen {0}; a: kill {0}, gen {1}
        let b = GenKillTransfer::gen_bit(4, 0);
        let mut a = GenKillTransfer::gen_bit(4, 1);
        a.kill.insert(0);
        let c = dom.extend(&a, &b);
        // a after b: bit 0 generated by b is killed by a, bit 1 survives
        let empty = FixedBitSet::with_capacity(4);
        let out = c.apply(&empty);
        assert!(!out.contains(0));
        assert!(out.contains(1));
    }

    #[test]
    fn combine_widens() {
        let dom = GenKillDomain::new(4);
        let a = GenKillTransfer::gen_bit(4, 0);
        let b = GenKillTransfer::gen_bit(4, 1);
        let c = dom.combine(&a, &b);
        let empty = FixedBitSet::with_capacity(4);
        let out = c.apply(&empty);
        assert!(out.contains(0) && out.contains(1));
    }

    #[test]
    fn one_is_identity_transfer() {
        let dom = GenKillDomain::new(4);
        let mut fact = FixedBitSet::with_capacity(4);
        fact.insert(2);
        assert_eq!(dom.one().apply(&fact), fact);
    }

    #[test]
    fn zero_is_combine_identity() {
        let dom = GenKillDomain::new(4);
        let a = GenKillTransfer::gen_bit(4, 3);
        assert!(dom.equal(&dom.combine(&a, &dom.zero()), &a));
    }
}
