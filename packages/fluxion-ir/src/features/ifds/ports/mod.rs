/*
 * IFDS/IDE Problem Ports
 *
 * A client provides the finite fact domain and four flow-function
 * families; the solver owns the graph walk. IDE clients additionally
 * provide edge functions over a value lattice. Edge functions are plain
 * associated types manipulated through the problem, so instantiations
 * stay monomorphic.
 */

use crate::features::ifds::domain::FlowFact;
use crate::shared::models::{Function, Inst, InstId};
use std::fmt::Debug;

pub trait IfdsProblem {
    type Fact: FlowFact;

    /// Seed facts at procedure entries (normally the zero fact at `main`).
    fn initial_facts(&self) -> Vec<(InstId, Self::Fact)>;

    /// Intra-procedural edge.
    fn normal_flow(&self, stmt: &Inst, fact: &Self::Fact) -> Vec<Self::Fact>;

    /// Actual→formal mapping into an internal callee.
    fn call_flow(&self, call: &Inst, callee: &Function, fact: &Self::Fact) -> Vec<Self::Fact>;

    /// Callee exit back to the caller: return values and output params.
    fn return_flow(
        &self,
        call: &Inst,
        callee: &Function,
        exit_fact: &Self::Fact,
        call_fact: &Self::Fact,
    ) -> Vec<Self::Fact>;

    /// Caller-side bypass across a call site (also models external calls).
    fn call_to_return_flow(&self, call: &Inst, fact: &Self::Fact) -> Vec<Self::Fact>;
}

/// IDE layer: a value lattice with `top`/`bottom`/`join` and composable
/// edge functions attached to every exploded edge.
pub trait IdeProblem: IfdsProblem {
    type Value: Clone + PartialEq + Debug;
    type EdgeFn: Clone + PartialEq + Debug;

    fn top(&self) -> Self::Value;
    fn bottom(&self) -> Self::Value;
    fn join_values(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Value entering the seed facts.
    fn initial_value(&self) -> Self::Value;

    fn identity_edge(&self) -> Self::EdgeFn;
    fn apply_edge(&self, f: &Self::EdgeFn, v: &Self::Value) -> Self::Value;

    fn normal_edge(
        &self,
        stmt: &Inst,
        from_fact: &Self::Fact,
        to_fact: &Self::Fact,
    ) -> Self::EdgeFn;

    fn call_edge(
        &self,
        call: &Inst,
        callee: &Function,
        from_fact: &Self::Fact,
        to_fact: &Self::Fact,
    ) -> Self::EdgeFn;

    fn return_edge(
        &self,
        call: &Inst,
        callee: &Function,
        exit_fact: &Self::Fact,
        to_fact: &Self::Fact,
    ) -> Self::EdgeFn;

    fn call_to_return_edge(
        &self,
        call: &Inst,
        from_fact: &Self::Fact,
        to_fact: &Self::Fact,
    ) -> Self::EdgeFn;
}
