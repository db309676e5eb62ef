/*
 * Interprocedural Reaching Definitions
 *
 * Gen/kill client of the context-sensitive engine. Every value-producing
 * instruction gets one bit; its transfer generates that bit and kills
 * nothing (SSA form never re-defines). Phase 2 facts are the bit sets of
 * definitions reaching each block entry.
 */

use crate::features::expression::{ExprArena, ExprId};
use crate::features::icfg::build_icfg;
use crate::features::interprocedural::domain::{EngineConfig, EngineResult};
use crate::features::interprocedural::infrastructure::engine::InterproceduralEngine;
use crate::features::interprocedural::ports::TransferFactory;
use crate::features::semiring::{GenKillDomain, GenKillTransfer, Semiring};
use crate::shared::models::{Inst, InstId, ModuleIndex, Result};
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

pub struct ReachingDefs {
    def_bits: FxHashMap<InstId, usize>,
    width: usize,
}

impl ReachingDefs {
    pub fn new(module: &ModuleIndex) -> Self {
        let mut def_bits = FxHashMap::default();
        let mut bit = 0usize;
        for inst in module.insts() {
            if inst.kind.result().is_some() {
                def_bits.insert(inst.id, bit);
                bit += 1;
            }
        }
        Self {
            def_bits,
            width: bit.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The bit assigned to a defining instruction.
    pub fn bit_of(&self, inst: InstId) -> Option<usize> {
        self.def_bits.get(&inst).copied()
    }

    /// Run the full two-phase analysis over a module.
    pub fn run(
        module: &ModuleIndex,
        config: EngineConfig,
    ) -> Result<EngineResult<GenKillTransfer, FixedBitSet>> {
        let analysis = Self::new(module);
        let dom = GenKillDomain::new(analysis.width);
        let icfg = build_icfg(module)?;
        let engine = InterproceduralEngine::new(&dom, module, &icfg, &analysis, config);
        engine.run()
    }
}

impl TransferFactory<GenKillDomain> for ReachingDefs {
    type Fact = FixedBitSet;

    fn transfer(
        &self,
        _dom: &GenKillDomain,
        inst: &Inst,
        arena: &mut ExprArena<GenKillDomain>,
        path: ExprId,
    ) -> ExprId {
        match self.def_bits.get(&inst.id) {
            Some(&bit) => arena.seq(GenKillTransfer::gen_bit(self.width, bit), path),
            None => path,
        }
    }

    fn entry_fact(&self) -> FixedBitSet {
        FixedBitSet::with_capacity(self.width)
    }

    fn apply_summary(&self, summary: &GenKillTransfer, input: &FixedBitSet) -> FixedBitSet {
        summary.apply(input)
    }

    fn join_facts(&self, a: &FixedBitSet, b: &FixedBitSet) -> FixedBitSet {
        let mut out = a.clone();
        out.union_with(b);
        out
    }

    fn facts_equal(&self, a: &FixedBitSet, b: &FixedBitSet) -> bool {
        a == b
    }
}
