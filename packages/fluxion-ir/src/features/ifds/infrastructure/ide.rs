/*
 * IDE Value Phase
 *
 * Layers value propagation on top of IFDS reachability: the tabulation
 * pass records the exploded edges it realizes, and this phase pushes
 * lattice values along them, joining across merging paths. For a
 * distributive client the result is the meet-over-paths value per
 * reached (stmt, fact) pair.
 */

use crate::features::ifds::domain::{ExplodedEdgeKind, FlowFact, IfdsConfig, IfdsResult};
use crate::features::ifds::infrastructure::graph::SupergraphSkeleton;
use crate::features::ifds::infrastructure::solver::IfdsSolver;
use crate::features::ifds::ports::IdeProblem;
use crate::shared::models::{InstId, ModuleIndex, Result};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::info;

#[derive(Debug)]
pub struct IdeResult<F: FlowFact, V> {
    pub reachability: IfdsResult<F>,
    /// Meet-over-paths value per reached (stmt, fact) node.
    pub values: FxHashMap<(InstId, F), V>,
}

pub fn solve_ide<P: IdeProblem>(
    problem: &P,
    module: &ModuleIndex,
    graph: &SupergraphSkeleton,
    config: IfdsConfig,
) -> Result<IdeResult<P::Fact, P::Value>> {
    let config = IfdsConfig {
        record_edges: true,
        ..config
    };
    let reachability = IfdsSolver::new(problem, module, graph, config).solve()?;

    let mut values: FxHashMap<(InstId, P::Fact), P::Value> = FxHashMap::default();
    let mut worklist: VecDeque<(InstId, P::Fact)> = VecDeque::new();

    for (stmt, fact) in problem.initial_facts() {
        values.insert((stmt, fact.clone()), problem.initial_value());
        worklist.push_back((stmt, fact));
    }

    let mut steps = 0u64;
    while let Some(node) = worklist.pop_front() {
        steps += 1;
        let Some(v) = values.get(&node).cloned() else {
            continue;
        };
        let Some(edges) = reachability.exploded.get(&node) else {
            continue;
        };
        for edge in edges {
            let edge_fn = match edge.kind {
                ExplodedEdgeKind::Normal => match module.inst(node.0) {
                    Some(inst) => problem.normal_edge(inst, &node.1, &edge.to_fact),
                    None => problem.identity_edge(),
                },
                ExplodedEdgeKind::Call => match (module.inst(node.0), graph.call_site(node.0)) {
                    (Some(call_inst), Some(cs)) => {
                        let callee = &module.functions()[cs.callee];
                        problem.call_edge(call_inst, callee, &node.1, &edge.to_fact)
                    }
                    _ => problem.identity_edge(),
                },
                ExplodedEdgeKind::Return { call } => {
                    match (module.inst(call), graph.call_site(call)) {
                        (Some(call_inst), Some(cs)) => {
                            let callee = &module.functions()[cs.callee];
                            problem.return_edge(call_inst, callee, &node.1, &edge.to_fact)
                        }
                        _ => problem.identity_edge(),
                    }
                }
                ExplodedEdgeKind::CallToReturn => match module.inst(node.0) {
                    Some(inst) => problem.call_to_return_edge(inst, &node.1, &edge.to_fact),
                    None => problem.identity_edge(),
                },
            };
            let propagated = problem.apply_edge(&edge_fn, &v);
            let target = (edge.to_stmt, edge.to_fact.clone());
            let updated = match values.get(&target) {
                None => Some(propagated),
                Some(old) => {
                    let joined = problem.join_values(old, &propagated);
                    (joined != *old).then_some(joined)
                }
            };
            if let Some(nv) = updated {
                values.insert(target.clone(), nv);
                worklist.push_back(target);
            }
        }
    }
    info!(steps, nodes = values.len(), "ide value phase finished");

    Ok(IdeResult {
        reachability,
        values,
    })
}
