/*
 * IFDS Tabulation Solver
 *
 * Worklist-based reachability over the implicit exploded supergraph.
 * Path edges record which facts reach a statement from a procedure-entry
 * fact; when a callee exit is reached, the (entry fact → exit facts)
 * summary is installed and immediately replayed at every caller that
 * consumed the same entry fact, so a callee is explored at most once per
 * entry fact. Context sensitivity is fact-indexed: the same callee can
 * be explored under several entry facts, each cached independently.
 *
 * The budget and the cancel token are inspected at worklist-pop
 * boundaries only; tripping either yields a partial result with the
 * matching flag set.
 */

use crate::features::ifds::domain::{
    ExplodedEdge, ExplodedEdgeKind, FlowFact, IfdsConfig, IfdsResult, IfdsStats, PathEdge,
};
use crate::features::ifds::infrastructure::graph::{CallSite, SupergraphSkeleton};
use crate::features::ifds::ports::IfdsProblem;
use crate::shared::models::{InstId, ModuleIndex, Result, SolveFlags};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info};

type EdgeKey<F> = (InstId, F, ExplodedEdgeKind);

pub struct IfdsSolver<'a, P: IfdsProblem> {
    problem: &'a P,
    module: &'a ModuleIndex,
    graph: &'a SupergraphSkeleton,
    config: IfdsConfig,

    path_edges: FxHashMap<InstId, FxHashSet<(P::Fact, P::Fact)>>,
    worklist: VecDeque<PathEdge<P::Fact>>,
    /// (callee, entry fact) → callers that entered with it.
    incoming: FxHashMap<(usize, P::Fact), FxHashSet<(InstId, P::Fact, P::Fact)>>,
    /// (callee, entry fact) → facts at callee exits.
    end_summary: FxHashMap<(usize, P::Fact), FxHashSet<(InstId, P::Fact)>>,
    reached: FxHashMap<InstId, FxHashSet<P::Fact>>,
    exploded: FxHashMap<(InstId, P::Fact), FxHashSet<EdgeKey<P::Fact>>>,
    stats: IfdsStats,
}

impl<'a, P: IfdsProblem> IfdsSolver<'a, P> {
    pub fn new(
        problem: &'a P,
        module: &'a ModuleIndex,
        graph: &'a SupergraphSkeleton,
        config: IfdsConfig,
    ) -> Self {
        Self {
            problem,
            module,
            graph,
            config,
            path_edges: FxHashMap::default(),
            worklist: VecDeque::new(),
            incoming: FxHashMap::default(),
            end_summary: FxHashMap::default(),
            reached: FxHashMap::default(),
            exploded: FxHashMap::default(),
            stats: IfdsStats::default(),
        }
    }

    pub fn solve(self) -> Result<IfdsResult<P::Fact>> {
        self.solve_with_progress(None)
    }

    pub fn solve_with_progress(
        mut self,
        mut progress: Option<&mut dyn FnMut(u64)>,
    ) -> Result<IfdsResult<P::Fact>> {
        let started = Instant::now();
        let mut flags = SolveFlags::complete();

        for (stmt, fact) in self.problem.initial_facts() {
            self.propagate(fact.clone(), stmt, fact, None);
        }

        while let Some(edge) = self.worklist.pop_front() {
            if let Some(token) = &self.config.cancellation_token {
                if token.is_cancelled() {
                    flags.cancelled = true;
                    break;
                }
            }
            if self.config.step_budget.exhausted(self.stats.steps, started) {
                flags.incomplete = true;
                break;
            }
            self.stats.steps += 1;
            if let Some(every) = self.config.show_progress {
                if self.stats.steps % every == 0 {
                    debug!(steps = self.stats.steps, "ifds progress");
                    if let Some(cb) = progress.as_deref_mut() {
                        cb(self.stats.steps);
                    }
                }
            }
            self.process(edge);
        }

        self.stats.path_edges = self.path_edges.values().map(FxHashSet::len).sum();
        self.stats.summary_edges = self.end_summary.values().map(FxHashSet::len).sum();
        self.stats.analysis_time_ms = started.elapsed().as_millis() as u64;
        info!(
            steps = self.stats.steps,
            path_edges = self.stats.path_edges,
            "ifds solve finished"
        );

        let exploded = self
            .exploded
            .into_iter()
            .map(|(from, outs)| {
                let edges = outs
                    .into_iter()
                    .map(|(to_stmt, to_fact, kind)| ExplodedEdge {
                        to_stmt,
                        to_fact,
                        kind,
                    })
                    .collect();
                (from, edges)
            })
            .collect();

        Ok(IfdsResult {
            reached: self.reached,
            exploded,
            stats: self.stats,
            flags,
        })
    }

    fn process(&mut self, edge: PathEdge<P::Fact>) {
        let PathEdge { source, stmt, fact } = edge;
        if let Some(call) = self.graph.call_site(stmt) {
            let call = call.clone();
            self.process_call(stmt, &source, &fact, &call);
        } else if self.graph.is_exit(stmt) {
            self.process_exit(stmt, &source, &fact);
        } else {
            self.process_normal(stmt, &source, &fact);
        }
    }

    fn process_normal(&mut self, stmt: InstId, source: &P::Fact, fact: &P::Fact) {
        let module: &'a ModuleIndex = self.module;
        let Some(inst) = module.inst(stmt) else {
            return;
        };
        // Calls without a resolvable internal target use the bypass family.
        let out_facts = if inst.kind.is_call() {
            self.problem.call_to_return_flow(inst, fact)
        } else {
            self.problem.normal_flow(inst, fact)
        };
        self.stats.flow_evaluations += 1;
        let kind = if inst.kind.is_call() {
            ExplodedEdgeKind::CallToReturn
        } else {
            ExplodedEdgeKind::Normal
        };
        for &succ in self.graph.normal_successors(stmt) {
            for out in &out_facts {
                self.propagate(
                    source.clone(),
                    succ,
                    out.clone(),
                    Some(((stmt, fact.clone()), kind)),
                );
            }
        }
    }

    fn process_call(&mut self, stmt: InstId, source: &P::Fact, fact: &P::Fact, call: &CallSite) {
        let module: &'a ModuleIndex = self.module;
        let Some(call_inst) = module.inst(stmt) else {
            return;
        };
        let callee_fn = &module.functions()[call.callee];

        // Into the callee.
        let entry_facts = self.problem.call_flow(call_inst, callee_fn, fact);
        self.stats.flow_evaluations += 1;
        for d3 in entry_facts {
            self.incoming
                .entry((call.callee, d3.clone()))
                .or_default()
                .insert((stmt, source.clone(), fact.clone()));
            self.propagate(
                d3.clone(),
                call.callee_entry,
                d3.clone(),
                Some(((stmt, fact.clone()), ExplodedEdgeKind::Call)),
            );

            // Replay an already-computed summary for this entry fact.
            let summaries: Vec<_> = self
                .end_summary
                .get(&(call.callee, d3.clone()))
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            for (exit, d4) in summaries {
                let rets = self.problem.return_flow(call_inst, callee_fn, &d4, fact);
                self.stats.flow_evaluations += 1;
                for d5 in rets {
                    for &rs in &call.return_sites {
                        self.propagate(
                            source.clone(),
                            rs,
                            d5.clone(),
                            Some(((exit, d4.clone()), ExplodedEdgeKind::Return { call: stmt })),
                        );
                    }
                }
            }
        }

        // Caller-side bypass.
        let bypass = self.problem.call_to_return_flow(call_inst, fact);
        self.stats.flow_evaluations += 1;
        for d3 in bypass {
            for &rs in &call.return_sites {
                self.propagate(
                    source.clone(),
                    rs,
                    d3.clone(),
                    Some(((stmt, fact.clone()), ExplodedEdgeKind::CallToReturn)),
                );
            }
        }
    }

    fn process_exit(&mut self, stmt: InstId, source: &P::Fact, fact: &P::Fact) {
        let Some(fi) = self.graph.function_of(stmt) else {
            return;
        };
        self.end_summary
            .entry((fi, source.clone()))
            .or_default()
            .insert((stmt, fact.clone()));

        let module: &'a ModuleIndex = self.module;
        let callers: Vec<_> = self
            .incoming
            .get(&(fi, source.clone()))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        let callee_fn = &module.functions()[fi];
        for (call_site, caller_source, call_fact) in callers {
            let Some(call_inst) = module.inst(call_site) else {
                continue;
            };
            let Some(call) = self.graph.call_site(call_site).cloned() else {
                continue;
            };
            let rets = self
                .problem
                .return_flow(call_inst, callee_fn, fact, &call_fact);
            self.stats.flow_evaluations += 1;
            for d5 in rets {
                for &rs in &call.return_sites {
                    self.propagate(
                        caller_source.clone(),
                        rs,
                        d5.clone(),
                        Some(((stmt, fact.clone()), ExplodedEdgeKind::Return { call: call_site })),
                    );
                }
            }
        }
    }

    fn propagate(
        &mut self,
        source: P::Fact,
        stmt: InstId,
        fact: P::Fact,
        from: Option<((InstId, P::Fact), ExplodedEdgeKind)>,
    ) {
        if self.config.record_edges {
            if let Some((from_node, kind)) = from {
                self.exploded
                    .entry(from_node)
                    .or_default()
                    .insert((stmt, fact.clone(), kind));
            }
        }
        self.reached.entry(stmt).or_default().insert(fact.clone());
        let new = self
            .path_edges
            .entry(stmt)
            .or_default()
            .insert((source.clone(), fact.clone()));
        if new {
            self.worklist.push_back(PathEdge { source, stmt, fact });
        }
    }
}
