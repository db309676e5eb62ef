/*
 * Thin Slicing
 *
 * Backward slicing restricted to value flow: control-dependence edges
 * are excluded entirely, and for field accesses the def-use edge coming
 * from the pointer operand is base-pointer flow, not value flow, so it
 * is excluded too. The rule at a load/store: the edge from the pointer
 * operand is base-pointer flow; the edge carrying the stored value or
 * the loaded result is value flow.
 *
 * The context-sensitive variant matches call/return crossings as a Dyck
 * language over (node, call-stack) states: traversing backward out of a
 * callee through a parameter-in edge must match the call site that was
 * pushed when the traversal entered through the return side. Mismatched
 * returns are pruned; the crossing edges serve only as context and add
 * no slice nodes of their own beyond the parameter slots they connect.
 *
 * Alias expansion explains why two field accesses may alias: for each
 * field access in a slice whose base pointer was excluded, a secondary
 * thin slice from that base pointer is computed.
 */

use crate::features::pdg::domain::{OperandRole, PdgEdgeKind};
use crate::features::pdg::infrastructure::graph::Pdg;
use crate::features::slicing::domain::{ThinSliceConfig, ThinSliceDiagnostics, ThinSliceResult};
use crate::shared::models::InstId;
use petgraph::graph::NodeIndex;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;
use tracing::debug;

type CallStack = SmallVec<[InstId; 8]>;

pub struct ThinSlicer<'a> {
    pdg: &'a Pdg,
}

impl<'a> ThinSlicer<'a> {
    pub fn new(pdg: &'a Pdg) -> Self {
        Self { pdg }
    }

    /// Thin backward slice from the seed nodes.
    pub fn backward(&self, seeds: &[NodeIndex], config: &ThinSliceConfig) -> ThinSliceResult {
        if config.context_sensitive {
            self.backward_dyck(seeds, config)
        } else {
            self.backward_insensitive(seeds, config)
        }
    }

    /// Thin forward slice: nodes the source may affect through value
    /// flow, with control and base-pointer propagation excluded.
    pub fn forward(&self, seeds: &[NodeIndex], config: &ThinSliceConfig) -> ThinSliceResult {
        let mut diagnostics = ThinSliceDiagnostics::default();
        let mut visited: FxHashSet<NodeIndex> = seeds.iter().copied().collect();
        let mut queue: VecDeque<(NodeIndex, usize)> =
            seeds.iter().map(|&n| (n, 0usize)).collect();

        while let Some((node, depth)) = queue.pop_front() {
            if config.max_depth.is_some_and(|cap| depth >= cap) {
                continue;
            }
            for (succ, kind) in self.pdg.out_edges(node) {
                if !self.follow(kind, &mut diagnostics) {
                    continue;
                }
                if visited.insert(succ) {
                    queue.push_back((succ, depth + 1));
                }
            }
        }

        diagnostics.slice_size = visited.len();
        ThinSliceResult {
            nodes: visited,
            diagnostics,
        }
    }

    /// For every field access in `slice` whose base pointer sits outside
    /// it, a secondary thin slice from that base pointer.
    pub fn expand_for_aliasing(
        &self,
        slice: &FxHashSet<NodeIndex>,
        config: &ThinSliceConfig,
    ) -> FxHashMap<NodeIndex, ThinSliceResult> {
        let mut expansions = FxHashMap::default();
        for &node in slice {
            for (pred, kind) in self.pdg.in_edges(node) {
                let is_base_ptr = matches!(
                    kind,
                    PdgEdgeKind::DefUse {
                        role: OperandRole::Pointer
                    }
                );
                if is_base_ptr && !slice.contains(&pred) && !expansions.contains_key(&pred) {
                    expansions.insert(pred, self.backward(&[pred], config));
                }
            }
        }
        expansions
    }

    fn backward_insensitive(
        &self,
        seeds: &[NodeIndex],
        config: &ThinSliceConfig,
    ) -> ThinSliceResult {
        let mut diagnostics = ThinSliceDiagnostics::default();
        let mut visited: FxHashSet<NodeIndex> = seeds.iter().copied().collect();
        let mut queue: VecDeque<(NodeIndex, usize)> =
            seeds.iter().map(|&n| (n, 0usize)).collect();

        while let Some((node, depth)) = queue.pop_front() {
            if config.max_depth.is_some_and(|cap| depth >= cap) {
                continue;
            }
            for (pred, kind) in self.pdg.in_edges(node) {
                if !self.follow(kind, &mut diagnostics) {
                    continue;
                }
                if visited.insert(pred) {
                    queue.push_back((pred, depth + 1));
                }
            }
        }

        diagnostics.slice_size = visited.len();
        debug!(size = visited.len(), "thin slice complete");
        ThinSliceResult {
            nodes: visited,
            diagnostics,
        }
    }

    fn backward_dyck(&self, seeds: &[NodeIndex], config: &ThinSliceConfig) -> ThinSliceResult {
        let mut diagnostics = ThinSliceDiagnostics::default();
        let mut nodes: FxHashSet<NodeIndex> = seeds.iter().copied().collect();
        let mut seen: FxHashSet<(NodeIndex, CallStack)> = FxHashSet::default();
        let mut queue: VecDeque<(NodeIndex, CallStack)> = VecDeque::new();
        for &seed in seeds {
            let state = (seed, CallStack::new());
            seen.insert(state.clone());
            queue.push_back(state);
        }

        while let Some((node, stack)) = queue.pop_front() {
            if let Some(cap) = config.max_states {
                if seen.len() >= cap {
                    diagnostics.state_limit_hit = true;
                    break;
                }
            }
            for (pred, kind) in self.pdg.in_edges(node) {
                if !self.follow(kind, &mut diagnostics) {
                    continue;
                }
                let next_stack = match self.crossing(node, pred, kind) {
                    // Backward into a callee through its return side.
                    Crossing::IntoCallee(site) => {
                        let mut next = stack.clone();
                        if let Some(cap) = config.max_stack_depth {
                            if next.len() >= cap {
                                diagnostics.stack_depth_limit_hit = true;
                                // Over the cap the walk degrades to
                                // context-insensitive matching.
                                next
                            } else {
                                next.push(site);
                                next
                            }
                        } else {
                            next.push(site);
                            next
                        }
                    }
                    // Backward out of a callee through a parameter-in
                    // edge: must match the pushed call site.
                    Crossing::OutOfCallee(site) => match stack.last() {
                        Some(&top) if top == site => {
                            let mut next = stack.clone();
                            next.pop();
                            next
                        }
                        Some(_) => continue, // mismatched return
                        None => stack.clone(), // unbalanced prefix is fine
                    },
                    Crossing::None => stack.clone(),
                };
                diagnostics.max_stack_depth_reached =
                    diagnostics.max_stack_depth_reached.max(next_stack.len());
                let state = (pred, next_stack);
                if seen.insert(state.clone()) {
                    nodes.insert(pred);
                    queue.push_back(state);
                }
            }
        }

        diagnostics.slice_size = nodes.len();
        ThinSliceResult { nodes, diagnostics }
    }

    /// Whether a backward step over `kind` is value flow; counts the
    /// exclusions otherwise.
    fn follow(&self, kind: PdgEdgeKind, diagnostics: &mut ThinSliceDiagnostics) -> bool {
        if kind.is_control() {
            diagnostics.control_deps_excluded += 1;
            return false;
        }
        if matches!(
            kind,
            PdgEdgeKind::DefUse {
                role: OperandRole::Pointer
            }
        ) {
            diagnostics.base_ptr_deps_excluded += 1;
            return false;
        }
        true
    }

    /// Classify a backward step as a call/return crossing.
    fn crossing(&self, node: NodeIndex, pred: NodeIndex, kind: PdgEdgeKind) -> Crossing {
        match kind {
            // node = ActualOut{call} ← pred = FormalOut: stepping backward
            // into the callee that returned here.
            PdgEdgeKind::ParamOut => match self.pdg.node(node).key.call_site() {
                Some(site) => Crossing::IntoCallee(site),
                None => Crossing::None,
            },
            // node = FormalIn ← pred = ActualIn{call}: stepping backward
            // out of the callee toward a caller.
            PdgEdgeKind::ParamIn => match self.pdg.node(pred).key.call_site() {
                Some(site) => Crossing::OutOfCallee(site),
                None => Crossing::None,
            },
            _ => Crossing::None,
        }
    }
}

enum Crossing {
    IntoCallee(InstId),
    OutOfCallee(InstId),
    None,
}
