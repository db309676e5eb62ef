/*
 * Linear Constant Propagation (IDE client)
 *
 * Facts track which SSA values are in scope; edge functions carry the
 * constant computation. A value is Top until a path defines it, a
 * concrete constant while all paths agree, Bottom once paths disagree or
 * an operation is not expressible as a constant.
 */

use crate::features::ifds::domain::FlowFact;
use crate::features::ifds::ports::{IdeProblem, IfdsProblem};
use crate::shared::models::{Function, Inst, InstId, InstKind, ModuleIndex, ValueId};
use serde::{Deserialize, Serialize};

/// Fact: the tautological zero, or "value v has been defined".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstFact {
    Zero,
    Var(ValueId),
}

impl FlowFact for ConstFact {
    fn zero() -> Self {
        ConstFact::Zero
    }

    fn is_zero(&self) -> bool {
        matches!(self, ConstFact::Zero)
    }
}

/// Value lattice: Top (undefined) ⊐ Const(c) ⊐ Bottom (non-constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstValue {
    Top,
    Const(i64),
    Bottom,
}

/// Edge function on the constant lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstEdge {
    Identity,
    /// Produce a fixed constant regardless of input.
    Const(i64),
    /// Force non-constant.
    Unknown,
}

pub struct ConstantPropagation<'a> {
    module: &'a ModuleIndex,
    entry: InstId,
}

impl<'a> ConstantPropagation<'a> {
    /// Analyze starting from `entry_function`'s first instruction.
    pub fn new(module: &'a ModuleIndex, entry_function: &str) -> Option<Self> {
        let func = module.function(entry_function)?;
        let entry = func.entry_block()?.insts.first()?.id;
        Some(Self { module, entry })
    }

    fn gen_result(inst: &Inst, fact: &ConstFact, out: &mut Vec<ConstFact>) {
        if fact.is_zero() {
            if let Some(result) = inst.kind.result() {
                out.push(ConstFact::Var(result));
            }
        }
    }

    fn is_internal_call(&self, call: &Inst) -> bool {
        matches!(
            &call.kind,
            InstKind::Call {
                callee: crate::shared::models::Callee::Direct(name),
                ..
            } if self.module.function(name).is_some_and(|f| !f.is_declaration())
        )
    }
}

impl IfdsProblem for ConstantPropagation<'_> {
    type Fact = ConstFact;

    fn initial_facts(&self) -> Vec<(InstId, ConstFact)> {
        vec![(self.entry, ConstFact::Zero)]
    }

    fn normal_flow(&self, stmt: &Inst, fact: &ConstFact) -> Vec<ConstFact> {
        let mut out = vec![fact.clone()];
        match (&stmt.kind, fact) {
            // Only a literal materializes its result out of the zero
            // fact. Every other defining statement gets its value from
            // operand facts alone, so a merge of agreeing paths stays
            // precise instead of being forced non-constant.
            (InstKind::Const { .. }, ConstFact::Zero) => {
                Self::gen_result(stmt, fact, &mut out)
            }
            (
                InstKind::Assign { result, operands } | InstKind::Phi { result, operands },
                ConstFact::Var(v),
            ) if operands.contains(v) => out.push(ConstFact::Var(*result)),
            _ => {}
        }
        out
    }

    fn call_flow(&self, call: &Inst, callee: &Function, fact: &ConstFact) -> Vec<ConstFact> {
        match fact {
            ConstFact::Zero => vec![ConstFact::Zero],
            ConstFact::Var(v) => {
                let InstKind::Call { args, .. } = &call.kind else {
                    return vec![];
                };
                args.iter()
                    .zip(callee.params.iter())
                    .filter(|(arg, _)| *arg == v)
                    .map(|(_, &param)| ConstFact::Var(param))
                    .collect()
            }
        }
    }

    fn return_flow(
        &self,
        call: &Inst,
        _callee: &Function,
        exit_fact: &ConstFact,
        _call_fact: &ConstFact,
    ) -> Vec<ConstFact> {
        // Only the returned value crosses back, renamed to the call result.
        match exit_fact {
            ConstFact::Zero => vec![ConstFact::Zero],
            ConstFact::Var(v) => {
                let InstKind::Call {
                    result: Some(result),
                    ..
                } = &call.kind
                else {
                    return vec![];
                };
                let returns_v = self
                    .module
                    .insts()
                    .any(|i| matches!(&i.kind, InstKind::Return { value: Some(rv) } if rv == v));
                if returns_v {
                    vec![ConstFact::Var(*result)]
                } else {
                    vec![]
                }
            }
        }
    }

    fn call_to_return_flow(&self, call: &Inst, fact: &ConstFact) -> Vec<ConstFact> {
        // Locals survive the call. The result of an internal call arrives
        // along the return edge; only external results are generated here.
        let mut out = vec![fact.clone()];
        if !self.is_internal_call(call) {
            Self::gen_result(call, fact, &mut out);
        }
        out
    }
}

impl IdeProblem for ConstantPropagation<'_> {
    type Value = ConstValue;
    type EdgeFn = ConstEdge;

    fn top(&self) -> ConstValue {
        ConstValue::Top
    }

    fn bottom(&self) -> ConstValue {
        ConstValue::Bottom
    }

    fn join_values(&self, a: &ConstValue, b: &ConstValue) -> ConstValue {
        match (a, b) {
            (ConstValue::Top, v) | (v, ConstValue::Top) => *v,
            (ConstValue::Const(x), ConstValue::Const(y)) if x == y => ConstValue::Const(*x),
            _ => ConstValue::Bottom,
        }
    }

    fn initial_value(&self) -> ConstValue {
        ConstValue::Top
    }

    fn identity_edge(&self) -> ConstEdge {
        ConstEdge::Identity
    }

    fn apply_edge(&self, f: &ConstEdge, v: &ConstValue) -> ConstValue {
        match f {
            ConstEdge::Identity => *v,
            ConstEdge::Const(c) => ConstValue::Const(*c),
            ConstEdge::Unknown => ConstValue::Bottom,
        }
    }

    fn normal_edge(&self, stmt: &Inst, from: &ConstFact, to: &ConstFact) -> ConstEdge {
        match (&stmt.kind, from, to) {
            // Materializing a literal: the zero fact generates the result.
            (InstKind::Const { result, value }, ConstFact::Zero, ConstFact::Var(v))
                if v == result =>
            {
                ConstEdge::Const(*value)
            }
            // Single-operand copy keeps the operand's value.
            (InstKind::Assign { result, operands }, ConstFact::Var(src), ConstFact::Var(v))
                if v == result && operands.len() == 1 && operands[0] == *src =>
            {
                ConstEdge::Identity
            }
            // Multi-operand computation is not expressible as a constant
            // move.
            (InstKind::Assign { result, .. }, ConstFact::Var(_), ConstFact::Var(v))
                if v == result =>
            {
                ConstEdge::Unknown
            }
            _ => ConstEdge::Identity,
        }
    }

    fn call_edge(
        &self,
        _call: &Inst,
        _callee: &Function,
        _from: &ConstFact,
        _to: &ConstFact,
    ) -> ConstEdge {
        ConstEdge::Identity
    }

    fn return_edge(
        &self,
        _call: &Inst,
        _callee: &Function,
        _exit_fact: &ConstFact,
        _to: &ConstFact,
    ) -> ConstEdge {
        ConstEdge::Identity
    }

    fn call_to_return_edge(&self, call: &Inst, from: &ConstFact, to: &ConstFact) -> ConstEdge {
        match (from, to) {
            // Results generated here belong to external calls: unknown.
            (ConstFact::Zero, ConstFact::Var(v)) if call.kind.result() == Some(*v) => {
                ConstEdge::Unknown
            }
            _ => ConstEdge::Identity,
        }
    }
}
