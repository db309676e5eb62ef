/*
 * Interprocedural Taint (NPA client)
 *
 * Summary-based taint propagation on the taint-transfer semiring: one
 * bit per SSA value, per-instruction transfers add propagation edges
 * (operand → result, stored value → pointer, pointer → loaded result),
 * and the specification contributes source gens and pipe edges at
 * external calls. Call transfers rename actuals into formals and
 * returned values into call results, so callee summaries compose with
 * caller paths in the shared bit space. Memory is proxied by the
 * pointer value's bit; precise alias treatment lives in the IFDS
 * client.
 */

use crate::features::expression::{ExprArena, ExprId};
use crate::features::icfg::build_icfg;
use crate::features::interprocedural::domain::{EngineConfig, EngineResult};
use crate::features::interprocedural::infrastructure::engine::InterproceduralEngine;
use crate::features::interprocedural::ports::TransferFactory;
use crate::features::semiring::{Semiring, TaintTransfer, TaintTransferDomain};
use crate::features::taint_analysis::domain::{Position, TaintSpecConfig};
use crate::shared::models::{
    Block, CallString, Callee, Function, Inst, InstId, InstKind, ModuleIndex, Result, ValueId,
};
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

pub struct NpaTaint<'a> {
    module: &'a ModuleIndex,
    spec: &'a TaintSpecConfig,
    value_bits: FxHashMap<ValueId, usize>,
    width: usize,
}

impl<'a> NpaTaint<'a> {
    pub fn new(module: &'a ModuleIndex, spec: &'a TaintSpecConfig) -> Self {
        let mut value_bits = FxHashMap::default();
        let mut bit = 0usize;
        for global in module.globals() {
            value_bits.insert(global.id, bit);
            bit += 1;
        }
        for func in module.functions() {
            for &param in &func.params {
                value_bits.insert(param, bit);
                bit += 1;
            }
        }
        for inst in module.insts() {
            if let Some(result) = inst.kind.result() {
                value_bits.insert(result, bit);
                bit += 1;
            }
        }
        Self {
            module,
            spec,
            value_bits,
            width: bit.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn bit_of(&self, value: ValueId) -> Option<usize> {
        self.value_bits.get(&value).copied()
    }

    fn pos_bits(&self, args: &[ValueId], result: Option<ValueId>, pos: Position) -> Vec<usize> {
        let values: Vec<ValueId> = match pos {
            Position::Ret => result.into_iter().collect(),
            Position::Arg(i) => args.get(i).copied().into_iter().collect(),
            Position::AfterArg(i) => args.iter().skip(i).copied().collect(),
        };
        values
            .into_iter()
            .filter_map(|v| self.bit_of(v))
            .collect()
    }

    /// Local transfer of one instruction, identity when it moves nothing.
    fn inst_transfer(&self, dom: &TaintTransferDomain, inst: &Inst) -> Option<TaintTransfer> {
        let mut tf = dom.one();
        let mut touched = false;
        match &inst.kind {
            InstKind::Assign { result, operands } | InstKind::Phi { result, operands } => {
                if let Some(to) = self.bit_of(*result) {
                    for op in operands {
                        if let Some(from) = self.bit_of(*op) {
                            tf.add_edge(from, to);
                            touched = true;
                        }
                    }
                }
            }
            InstKind::Gep { result, base, .. } => {
                if let (Some(from), Some(to)) = (self.bit_of(*base), self.bit_of(*result)) {
                    tf.add_edge(from, to);
                    touched = true;
                }
            }
            InstKind::Load { result, pointer } => {
                if let (Some(from), Some(to)) = (self.bit_of(*pointer), self.bit_of(*result)) {
                    tf.add_edge(from, to);
                    touched = true;
                }
            }
            InstKind::Store { value, pointer } => {
                if let (Some(from), Some(to)) = (self.bit_of(*value), self.bit_of(*pointer)) {
                    tf.add_edge(from, to);
                    touched = true;
                }
            }
            InstKind::Call {
                callee: Callee::Direct(name),
                args,
                result,
            } => {
                if let Some(fspec) = self.spec.get(name) {
                    for src in &fspec.sources {
                        for bit in self.pos_bits(args, *result, src.position) {
                            tf.add_gen(bit);
                            touched = true;
                        }
                    }
                    for pipe in &fspec.pipes {
                        for from in self.pos_bits(args, *result, pipe.from.position) {
                            for to in self.pos_bits(args, *result, pipe.to.position) {
                                tf.add_edge(from, to);
                                touched = true;
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        touched.then_some(tf)
    }

    fn returned_bits(&self, callee: &Function) -> Vec<usize> {
        callee
            .blocks
            .iter()
            .flat_map(|b| b.insts.iter())
            .filter_map(|i| match &i.kind {
                InstKind::Return { value: Some(v) } => self.bit_of(*v),
                _ => None,
            })
            .collect()
    }

    /// Run the two-phase analysis over a module.
    pub fn run(
        module: &ModuleIndex,
        spec: &TaintSpecConfig,
        config: EngineConfig,
    ) -> Result<NpaTaintResult> {
        let analysis = NpaTaint::new(module, spec);
        let dom = TaintTransferDomain::new(analysis.width);
        let icfg = build_icfg(module)?;
        let k = config.k_cfa_depth;
        let engine = InterproceduralEngine::new(&dom, module, &icfg, &analysis, config);
        let engine_result = engine.run()?;
        let sink_hits = analysis.scan_sinks(&dom, &engine_result, k);
        Ok(NpaTaintResult {
            value_bits: analysis.value_bits,
            engine: engine_result,
            sink_hits,
        })
    }

    /// Walk each reachable block, applying instruction transfers to the
    /// block-entry fact and checking sink arguments at call sites.
    fn scan_sinks(
        &self,
        dom: &TaintTransferDomain,
        result: &EngineResult<TaintTransfer, FixedBitSet>,
        k: usize,
    ) -> Vec<NpaSinkHit> {
        let mut hits = Vec::new();
        for ((block_id, cs), sym) in &result.block_symbols {
            let Some(entry_fact) = result.block_entry_facts.get(sym) else {
                continue;
            };
            let Some(block) = self.module.block(*block_id) else {
                continue;
            };
            let mut fact = entry_fact.clone();
            self.walk_block(dom, result, cs, k, block, &mut fact, &mut hits);
        }
        hits.sort_by_key(|h| (h.call, h.arg_index));
        hits.dedup_by_key(|h| (h.call, h.arg_index));
        hits
    }

    fn walk_block(
        &self,
        dom: &TaintTransferDomain,
        result: &EngineResult<TaintTransfer, FixedBitSet>,
        cs: &CallString,
        k: usize,
        block: &Block,
        fact: &mut FixedBitSet,
        hits: &mut Vec<NpaSinkHit>,
    ) {
        for inst in &block.insts {
            if let InstKind::Call {
                callee: Callee::Direct(name),
                args,
                ..
            } = &inst.kind
            {
                if let Some(fspec) = self.spec.get(name) {
                    for sink in &fspec.sinks {
                        for (i, arg) in args.iter().enumerate() {
                            let selected = match sink.position {
                                Position::Arg(j) => i == j,
                                Position::AfterArg(j) => i >= j,
                                Position::Ret => false,
                            };
                            let tainted = self
                                .bit_of(*arg)
                                .is_some_and(|bit| fact.contains(bit));
                            if selected && tainted {
                                hits.push(NpaSinkHit {
                                    call: inst.id,
                                    function: name.clone(),
                                    arg_index: i,
                                });
                            }
                        }
                    }
                }
                // Apply the callee's context-sensitive summary so its
                // effect on renamed bits reaches the rest of the block.
                if let Some(fi) = self.module.function_index(name) {
                    let callee = &self.module.functions()[fi];
                    if !callee.is_declaration() {
                        let callee_cs = cs.push(inst.id, k);
                        let summary = result.function_summary(fi, &callee_cs).cloned();
                        if let Some(summary) = summary {
                            let entry_tf = self.call_entry(dom, inst, callee);
                            let ret_tf = self.call_return(dom, inst, callee);
                            let composed =
                                dom.extend(&ret_tf, &dom.extend(&summary, &entry_tf));
                            *fact = composed.apply(fact);
                        }
                        continue;
                    }
                }
            }
            if let Some(tf) = self.inst_transfer(dom, inst) {
                *fact = tf.apply(fact);
            }
        }
    }

    fn call_entry(
        &self,
        dom: &TaintTransferDomain,
        call: &Inst,
        callee: &Function,
    ) -> TaintTransfer {
        let mut tf = dom.one();
        if let InstKind::Call { args, .. } = &call.kind {
            for (arg, param) in args.iter().zip(callee.params.iter()) {
                if let (Some(from), Some(to)) = (self.bit_of(*arg), self.bit_of(*param)) {
                    tf.add_edge(from, to);
                }
            }
        }
        tf
    }

    fn call_return(
        &self,
        dom: &TaintTransferDomain,
        call: &Inst,
        callee: &Function,
    ) -> TaintTransfer {
        let mut tf = dom.one();
        if let InstKind::Call {
            result: Some(result),
            ..
        } = &call.kind
        {
            if let Some(to) = self.bit_of(*result) {
                for from in self.returned_bits(callee) {
                    tf.add_edge(from, to);
                }
            }
        }
        tf
    }
}

impl TransferFactory<TaintTransferDomain> for NpaTaint<'_> {
    type Fact = FixedBitSet;

    fn transfer(
        &self,
        dom: &TaintTransferDomain,
        inst: &Inst,
        arena: &mut ExprArena<TaintTransferDomain>,
        path: ExprId,
    ) -> ExprId {
        match self.inst_transfer(dom, inst) {
            Some(tf) => arena.seq(tf, path),
            None => path,
        }
    }

    fn call_entry_transfer(
        &self,
        dom: &TaintTransferDomain,
        call: &Inst,
        callee: &Function,
    ) -> TaintTransfer {
        self.call_entry(dom, call, callee)
    }

    fn call_return_transfer(
        &self,
        dom: &TaintTransferDomain,
        call: &Inst,
        callee: &Function,
    ) -> TaintTransfer {
        self.call_return(dom, call, callee)
    }

    fn entry_fact(&self) -> FixedBitSet {
        FixedBitSet::with_capacity(self.width)
    }

    fn apply_summary(&self, summary: &TaintTransfer, input: &FixedBitSet) -> FixedBitSet {
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

/// A sink argument observed tainted during the block walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpaSinkHit {
    pub call: InstId,
    pub function: String,
    pub arg_index: usize,
}

#[derive(Debug)]
pub struct NpaTaintResult {
    pub engine: EngineResult<TaintTransfer, FixedBitSet>,
    pub sink_hits: Vec<NpaSinkHit>,
    value_bits: FxHashMap<ValueId, usize>,
}

impl NpaTaintResult {
    /// Values tainted at a block entry under a context.
    pub fn tainted_at_block_entry(
        &self,
        block: crate::shared::models::BlockId,
        cs: &CallString,
    ) -> Vec<ValueId> {
        let Some(fact) = self.engine.block_fact(block, cs) else {
            return Vec::new();
        };
        let mut values: Vec<ValueId> = self
            .value_bits
            .iter()
            .filter(|(_, &bit)| fact.contains(bit))
            .map(|(&v, _)| v)
            .collect();
        values.sort();
        values
    }
}
