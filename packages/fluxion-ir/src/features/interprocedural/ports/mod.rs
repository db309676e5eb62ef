/*
 * Transfer Factory Port
 *
 * A client analysis lifts IR semantics into the solver's world through
 * this trait: per-instruction transfer functions for Phase 1, and fact
 * manipulation for Phase 2. The call-related transfers default to the
 * multiplicative identity so a client only overrides what it models.
 */

use crate::features::expression::{ExprArena, ExprId};
use crate::features::semiring::Semiring;
use crate::shared::models::{Function, Inst};
use std::fmt::Debug;

pub trait TransferFactory<D: Semiring> {
    /// Fact type propagated top-down in Phase 2.
    type Fact: Clone + Debug;

    /// Wrap the running path expression with this instruction's transfer.
    /// The default leaves the path untouched (identity transfer).
    fn transfer(&self, dom: &D, inst: &Inst, arena: &mut ExprArena<D>, path: ExprId) -> ExprId {
        let _ = (dom, inst, arena);
        path
    }

    /// Parameter passing into a callee at a direct internal call.
    fn call_entry_transfer(&self, dom: &D, call: &Inst, callee: &Function) -> D::Value {
        let _ = (call, callee);
        dom.one()
    }

    /// Return-value and output-parameter modeling after an internal call.
    fn call_return_transfer(&self, dom: &D, call: &Inst, callee: &Function) -> D::Value {
        let _ = (call, callee);
        dom.one()
    }

    /// Opaque summary for external or unresolved calls.
    fn call_to_return_transfer(&self, dom: &D, call: &Inst) -> D::Value {
        let _ = call;
        dom.one()
    }

    /// Fact entering the program's entry points.
    fn entry_fact(&self) -> Self::Fact;

    /// Apply a solved path summary to a function's input fact.
    fn apply_summary(&self, summary: &D::Value, input: &Self::Fact) -> Self::Fact;

    fn join_facts(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact;

    fn facts_equal(&self, a: &Self::Fact, b: &Self::Fact) -> bool;
}
