/*
 * IFDS Taint Problem
 *
 * Concrete instantiation of the IFDS framework: taint enters at
 * source-tagged calls (generated from the zero fact), propagates through
 * assignments, phis, loads and stores (memory via the alias oracle),
 * crosses calls through actual/formal renaming and pipe specifications,
 * and is checked at sink-tagged call arguments. Sanitization is
 * expressed in the specification itself: a function without a pipe does
 * not forward taint.
 *
 * Traces are reconstructed from the recorded exploded edges: walking
 * backward from a sink hit until the fact was generated from zero yields
 * the source call and every propagation hop in between.
 */

use crate::features::ifds::domain::{FlowFact, IfdsResult};
use crate::features::ifds::ports::IfdsProblem;
use crate::features::taint_analysis::domain::{
    AccessMode, Position, TaintFact, TaintPos, TaintReport, TaintSpecConfig, TraceStep,
};
use crate::features::taint_analysis::ports::AliasOracle;
use crate::shared::models::{Callee, Function, Inst, InstId, InstKind, ModuleIndex, ValueId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

pub struct TaintProblem<'a, A: AliasOracle> {
    module: &'a ModuleIndex,
    spec: &'a TaintSpecConfig,
    oracle: &'a A,
}

impl<'a, A: AliasOracle> TaintProblem<'a, A> {
    pub fn new(module: &'a ModuleIndex, spec: &'a TaintSpecConfig, oracle: &'a A) -> Self {
        Self {
            module,
            spec,
            oracle,
        }
    }

    fn call_parts<'i>(call: &'i Inst) -> Option<(&'i str, &'i [ValueId], Option<ValueId>)> {
        let InstKind::Call {
            callee,
            args,
            result,
        } = &call.kind
        else {
            return None;
        };
        match callee {
            Callee::Direct(name) => Some((name.as_str(), args.as_slice(), *result)),
            Callee::Indirect => None,
        }
    }

    /// Whether `fact` sits at `pos` of this call.
    fn fact_at_pos(&self, fact: &TaintFact, args: &[ValueId], pos: &TaintPos) -> bool {
        let indices = pos.arg_indices(args.len());
        match (pos.mode, fact) {
            (AccessMode::Value, TaintFact::Value(v)) => indices.iter().any(|&i| args[i] == *v),
            (AccessMode::Deref, TaintFact::Memory(p)) => {
                indices.iter().any(|&i| self.oracle.may_alias(*p, args[i]))
            }
            _ => false,
        }
    }

    /// Facts generated at `pos` of this call.
    fn gen_at_pos(
        &self,
        args: &[ValueId],
        result: Option<ValueId>,
        pos: &TaintPos,
        out: &mut Vec<TaintFact>,
    ) {
        match pos.position {
            Position::Ret => {
                if let Some(r) = result {
                    out.push(match pos.mode {
                        AccessMode::Value => TaintFact::Value(r),
                        AccessMode::Deref => TaintFact::Memory(r),
                    });
                }
            }
            Position::Arg(_) | Position::AfterArg(_) => {
                for i in pos.arg_indices(args.len()) {
                    out.push(match pos.mode {
                        AccessMode::Value => TaintFact::Value(args[i]),
                        AccessMode::Deref => TaintFact::Memory(args[i]),
                    });
                }
            }
        }
    }

    /// Return values of a defined function.
    fn returned_values(callee: &Function) -> Vec<ValueId> {
        callee
            .blocks
            .iter()
            .flat_map(|b| b.insts.iter())
            .filter_map(|i| match &i.kind {
                InstKind::Return { value } => *value,
                _ => None,
            })
            .collect()
    }
}

impl<A: AliasOracle> IfdsProblem for TaintProblem<'_, A> {
    type Fact = TaintFact;

    fn initial_facts(&self) -> Vec<(InstId, TaintFact)> {
        let seeds = match self.module.function("main").filter(|f| !f.is_declaration()) {
            Some(main) => vec![main],
            None => self
                .module
                .functions()
                .iter()
                .filter(|f| !f.is_declaration())
                .collect(),
        };
        seeds
            .into_iter()
            .filter_map(|f| f.entry_block().and_then(|b| b.insts.first()))
            .map(|inst| (inst.id, TaintFact::Zero))
            .collect()
    }

    fn normal_flow(&self, stmt: &Inst, fact: &TaintFact) -> Vec<TaintFact> {
        let mut out = vec![fact.clone()];
        match (&stmt.kind, fact) {
            (
                InstKind::Assign { result, operands } | InstKind::Phi { result, operands },
                TaintFact::Value(v),
            ) if operands.contains(v) => {
                out.push(TaintFact::Value(*result));
            }
            (InstKind::Gep { result, base, .. }, TaintFact::Value(v)) if base == v => {
                out.push(TaintFact::Value(*result));
            }
            // Loading through a pointer whose memory is tainted.
            (InstKind::Load { result, pointer }, TaintFact::Memory(p))
                if self.oracle.may_alias(*p, *pointer) =>
            {
                out.push(TaintFact::Value(*result));
            }
            // Storing a tainted value taints the pointed-to memory (weak).
            (InstKind::Store { value, pointer }, TaintFact::Value(v)) if value == v => {
                out.push(TaintFact::Memory(*pointer));
            }
            _ => {}
        }
        out
    }

    fn call_flow(&self, call: &Inst, callee: &Function, fact: &TaintFact) -> Vec<TaintFact> {
        let Some((_, args, _)) = Self::call_parts(call) else {
            return if fact.is_zero() {
                vec![TaintFact::Zero]
            } else {
                vec![]
            };
        };
        match fact {
            TaintFact::Zero => vec![TaintFact::Zero],
            // Facts about module globals are visible everywhere.
            TaintFact::Value(v) | TaintFact::Memory(v) if self.module.is_global(*v) => {
                vec![fact.clone()]
            }
            TaintFact::Value(v) => args
                .iter()
                .zip(callee.params.iter())
                .filter(|(arg, _)| *arg == v)
                .map(|(_, &param)| TaintFact::Value(param))
                .collect(),
            TaintFact::Memory(p) => args
                .iter()
                .zip(callee.params.iter())
                .filter(|(arg, _)| self.oracle.may_alias(*p, **arg))
                .map(|(_, &param)| TaintFact::Memory(param))
                .collect(),
        }
    }

    fn return_flow(
        &self,
        call: &Inst,
        callee: &Function,
        exit_fact: &TaintFact,
        _call_fact: &TaintFact,
    ) -> Vec<TaintFact> {
        let Some((_, args, result)) = Self::call_parts(call) else {
            return if exit_fact.is_zero() {
                vec![TaintFact::Zero]
            } else {
                vec![]
            };
        };
        match exit_fact {
            TaintFact::Zero => vec![TaintFact::Zero],
            TaintFact::Value(v) | TaintFact::Memory(v) if self.module.is_global(*v) => {
                vec![exit_fact.clone()]
            }
            TaintFact::Value(v) => {
                let mut out = Vec::new();
                if let Some(r) = result {
                    if Self::returned_values(callee).contains(v) {
                        out.push(TaintFact::Value(r));
                    }
                }
                out
            }
            TaintFact::Memory(p) => {
                let mut out = Vec::new();
                // Output parameters: memory written through a formal flows
                // back to the matching actual.
                for (arg, param) in args.iter().zip(callee.params.iter()) {
                    if p == param {
                        out.push(TaintFact::Memory(*arg));
                    }
                }
                // Returned pointers keep their memory taint.
                if let Some(r) = result {
                    if Self::returned_values(callee).contains(p) {
                        out.push(TaintFact::Memory(r));
                    }
                }
                out
            }
        }
    }

    fn call_to_return_flow(&self, call: &Inst, fact: &TaintFact) -> Vec<TaintFact> {
        let mut out = vec![fact.clone()];
        let Some((name, args, result)) = Self::call_parts(call) else {
            return out;
        };
        let Some(spec) = self.spec.get(name) else {
            return out;
        };
        if fact.is_zero() {
            for src in &spec.sources {
                self.gen_at_pos(args, result, src, &mut out);
            }
        } else {
            for pipe in &spec.pipes {
                if self.fact_at_pos(fact, args, &pipe.from) {
                    self.gen_at_pos(args, result, &pipe.to, &mut out);
                }
            }
        }
        out
    }
}

/// A sink argument reached by a taint fact.
#[derive(Debug, Clone)]
pub struct SinkHit {
    pub call: InstId,
    pub function: String,
    pub fact: TaintFact,
}

/// Scan the solved result for tainted facts at sink-tagged calls.
pub fn find_sink_hits<A: AliasOracle>(
    module: &ModuleIndex,
    spec: &TaintSpecConfig,
    oracle: &A,
    result: &IfdsResult<TaintFact>,
) -> Vec<SinkHit> {
    let problem = TaintProblem::new(module, spec, oracle);
    let mut hits = Vec::new();
    for inst in module.insts() {
        let Some((name, args, _)) = TaintProblem::<A>::call_parts(inst) else {
            continue;
        };
        let Some(fspec) = spec.get(name) else {
            continue;
        };
        for sink in &fspec.sinks {
            for fact in result.facts_at(inst.id) {
                if problem.fact_at_pos(fact, args, sink) {
                    hits.push(SinkHit {
                        call: inst.id,
                        function: name.to_string(),
                        fact: fact.clone(),
                    });
                }
            }
        }
    }
    debug!(hits = hits.len(), "sink scan complete");
    hits
}

/// Walk recorded exploded edges backward from a sink hit to the zero-fact
/// generation point, yielding the hop sequence source → sink.
pub fn reconstruct_trace(
    module: &ModuleIndex,
    result: &IfdsResult<TaintFact>,
    hit: &SinkHit,
) -> Option<TaintReport> {
    // Reverse adjacency over recorded exploded edges.
    let mut preds: FxHashMap<(InstId, TaintFact), Vec<(InstId, TaintFact)>> = FxHashMap::default();
    for ((from_stmt, from_fact), edges) in &result.exploded {
        for edge in edges {
            preds
                .entry((edge.to_stmt, edge.to_fact.clone()))
                .or_default()
                .push((*from_stmt, from_fact.clone()));
        }
    }

    let start = (hit.call, hit.fact.clone());
    let mut parents: FxHashMap<(InstId, TaintFact), (InstId, TaintFact)> = FxHashMap::default();
    let mut visited: FxHashSet<(InstId, TaintFact)> = FxHashSet::default();
    let mut queue = VecDeque::from([start.clone()]);
    visited.insert(start.clone());

    let mut origin: Option<(InstId, TaintFact)> = None;
    'bfs: while let Some(node) = queue.pop_front() {
        for pred in preds.get(&node).into_iter().flatten() {
            if pred.1.is_zero() {
                // Generation edge: `pred.0` is the source call.
                parents.insert(pred.clone(), node.clone());
                origin = Some(pred.clone());
                break 'bfs;
            }
            if visited.insert(pred.clone()) {
                parents.insert(pred.clone(), node.clone());
                queue.push_back(pred.clone());
            }
        }
    }

    let origin = origin?;
    let mut steps = Vec::new();
    let mut cursor = origin.clone();
    loop {
        push_step(module, &mut steps, cursor.0);
        if cursor == start {
            break;
        }
        cursor = parents.get(&cursor)?.clone();
    }
    // The sink call itself terminates the trace even when the BFS start
    // node sat at the sink already.
    if steps.last().map(|s: &TraceStep| s.inst) != Some(hit.call) {
        push_step(module, &mut steps, hit.call);
    }

    Some(TaintReport {
        source: steps.first()?.clone(),
        sink: steps.last()?.clone(),
        steps,
        sink_function: hit.function.clone(),
    })
}

fn push_step(module: &ModuleIndex, steps: &mut Vec<TraceStep>, inst: InstId) {
    if steps.last().map(|s| s.inst) == Some(inst) {
        return;
    }
    let loc = module.inst(inst).and_then(|i| i.loc.clone());
    steps.push(TraceStep { inst, loc });
}
