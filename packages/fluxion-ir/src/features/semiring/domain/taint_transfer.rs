/*
 * Taint Transfer Domain
 *
 * Elements are taint transfer functions f(x) = rel(x) ∪ gen, where `rel`
 * is a relation over value bits (rel[i] = bits that become tainted when
 * bit i is tainted on entry) and `gen` the unconditionally generated
 * bits.
 *
 * Composition (extend, "a after b"):
 *   (a ∘ b).rel[i] = a.rel(b.rel[i])
 *   (a ∘ b).gen    = a.rel(b.gen) ∪ a.gen
 *
 * Join is row-wise union. `one` is the identity relation, `zero` the
 * empty relation that drops every input bit.
 */

use super::Semiring;
use fixedbitset::FixedBitSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintTransfer {
    pub rel: Vec<FixedBitSet>,
    pub gen: FixedBitSet,
}

impl TaintTransfer {
    /// Apply the transfer to an input taint set.
    pub fn apply(&self, input: &FixedBitSet) -> FixedBitSet {
        let mut out = apply_rel(&self.rel, input);
        out.union_with(&self.gen);
        out
    }

    /// Record that taint on `from` propagates to `to`.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        if from < self.rel.len() && to < self.rel.len() {
            self.rel[from].insert(to);
        }
    }

    /// Record that `bit` is tainted regardless of input.
    pub fn add_gen(&mut self, bit: usize) {
        if bit < self.gen.len() {
            self.gen.insert(bit);
        }
    }
}

fn apply_rel(rel: &[FixedBitSet], input: &FixedBitSet) -> FixedBitSet {
    let width = rel.len();
    let mut out = FixedBitSet::with_capacity(width);
    for i in input.ones() {
        if i < width {
            out.union_with(&rel[i]);
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct TaintTransferDomain {
    width: usize,
}

impl TaintTransferDomain {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn empty_rel(&self) -> Vec<FixedBitSet> {
        vec![FixedBitSet::with_capacity(self.width); self.width]
    }

    fn identity_rel(&self) -> Vec<FixedBitSet> {
        let mut rel = self.empty_rel();
        for (i, row) in rel.iter_mut().enumerate() {
            row.insert(i);
        }
        rel
    }
}

impl Semiring for TaintTransferDomain {
    type Value = TaintTransfer;
    type Test = bool;

    const IDEMPOTENT: bool = true;

    fn zero(&self) -> TaintTransfer {
        TaintTransfer {
            rel: self.empty_rel(),
            gen: FixedBitSet::with_capacity(self.width),
        }
    }

    fn one(&self) -> TaintTransfer {
        TaintTransfer {
            rel: self.identity_rel(),
            gen: FixedBitSet::with_capacity(self.width),
        }
    }

    fn equal(&self, a: &TaintTransfer, b: &TaintTransfer) -> bool {
        a == b
    }

    fn combine(&self, a: &TaintTransfer, b: &TaintTransfer) -> TaintTransfer {
        let mut rel = a.rel.clone();
        for (row, other) in rel.iter_mut().zip(b.rel.iter()) {
            row.union_with(other);
        }
        let mut gen = a.gen.clone();
        gen.union_with(&b.gen);
        TaintTransfer { rel, gen }
    }

    fn extend(&self, a: &TaintTransfer, b: &TaintTransfer) -> TaintTransfer {
        let rel = b
            .rel
            .iter()
            .map(|row| apply_rel(&a.rel, row))
            .collect();
        let mut gen = apply_rel(&a.rel, &b.gen);
        gen.union_with(&a.gen);
        TaintTransfer { rel, gen }
    }

    fn display(&self, v: &TaintTransfer) -> String {
        format!("gen{:?}", v.gen.ones().collect::<Vec<_>>())
    }
}
