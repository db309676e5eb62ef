/*
 * IFDS Domain Types
 *
 * Facts are drawn from a finite domain plus the tautological zero fact
 * present at every point. The exploded supergraph is realized on demand:
 * path edges record reachability from a procedure entry fact, summary
 * edges cache a callee's effect per entry fact, and the recorded
 * exploded edges drive IDE value propagation and taint back-tracing.
 */

use crate::shared::models::{CancelToken, InstId, SolveFlags, StepBudget};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Dataflow fact. `zero` is the tautological fact that reaches every
/// point; flow functions must map it to at least itself.
pub trait FlowFact: Clone + Eq + Hash + Debug {
    fn zero() -> Self;
    fn is_zero(&self) -> bool;
}

/// Path edge ⟨entry(proc), source⟩ →* ⟨stmt, fact⟩.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEdge<F: FlowFact> {
    pub source: F,
    pub stmt: InstId,
    pub fact: F,
}

/// Kind tag on a recorded exploded edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplodedEdgeKind {
    Normal,
    Call,
    /// Return crossing, remembering the matching call site.
    Return { call: InstId },
    CallToReturn,
}

/// Recorded exploded-supergraph edge out of a `(stmt, fact)` node.
#[derive(Debug, Clone)]
pub struct ExplodedEdge<F: FlowFact> {
    pub to_stmt: InstId,
    pub to_fact: F,
    pub kind: ExplodedEdgeKind,
}

#[derive(Debug, Clone, Default)]
pub struct IfdsConfig {
    /// Emit a progress event every N worklist pops.
    pub show_progress: Option<u64>,
    pub step_budget: StepBudget,
    pub cancellation_token: Option<CancelToken>,
    /// Record exploded edges (required for IDE and trace reconstruction).
    pub record_edges: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IfdsStats {
    pub steps: u64,
    pub path_edges: usize,
    pub summary_edges: usize,
    pub flow_evaluations: u64,
    pub analysis_time_ms: u64,
}

/// Solver output: reached facts per statement plus the caches.
#[derive(Debug)]
pub struct IfdsResult<F: FlowFact> {
    /// Facts proven reachable at each statement.
    pub reached: FxHashMap<InstId, FxHashSet<F>>,
    /// Recorded exploded edges, forward adjacency (empty unless enabled).
    pub exploded: FxHashMap<(InstId, F), Vec<ExplodedEdge<F>>>,
    pub stats: IfdsStats,
    pub flags: SolveFlags,
}

impl<F: FlowFact> IfdsResult<F> {
    pub fn facts_at(&self, stmt: InstId) -> impl Iterator<Item = &F> {
        self.reached.get(&stmt).into_iter().flatten()
    }

    pub fn is_reached(&self, stmt: InstId, fact: &F) -> bool {
        self.reached.get(&stmt).is_some_and(|s| s.contains(fact))
    }
}
