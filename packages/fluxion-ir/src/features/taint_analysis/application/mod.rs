/*
 * Taint Analysis Service
 *
 * One-call entry: solve the IFDS taint problem over a module, scan sinks,
 * reconstruct traces and render the line-oriented report. The report
 * header names the analysis, the module, the wall-clock time and any
 * incomplete/cancelled flags.
 */

use crate::features::ifds::domain::{IfdsConfig, IfdsStats};
use crate::features::ifds::infrastructure::graph::SupergraphSkeleton;
use crate::features::ifds::infrastructure::solver::IfdsSolver;
use crate::features::taint_analysis::domain::{TaintReport, TaintSpecConfig};
use crate::features::taint_analysis::infrastructure::analysis::{
    find_sink_hits, reconstruct_trace, TaintProblem,
};
use crate::features::taint_analysis::ports::AliasOracle;
use crate::shared::models::{ModuleIndex, Result, SolveFlags};
use std::fmt::Write as _;
use std::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct TaintAnalysisOutcome {
    pub reports: Vec<TaintReport>,
    pub stats: IfdsStats,
    pub flags: SolveFlags,
    pub wall_ms: u64,
}

pub struct TaintAnalysisService;

impl TaintAnalysisService {
    pub fn run<A: AliasOracle>(
        module: &ModuleIndex,
        spec: &TaintSpecConfig,
        oracle: &A,
        config: IfdsConfig,
    ) -> Result<TaintAnalysisOutcome> {
        let started = Instant::now();
        let graph = SupergraphSkeleton::build(module)?;
        let problem = TaintProblem::new(module, spec, oracle);
        let config = IfdsConfig {
            record_edges: true,
            ..config
        };
        let solved = IfdsSolver::new(&problem, module, &graph, config).solve()?;

        let mut reports = Vec::new();
        for hit in find_sink_hits(module, spec, oracle, &solved) {
            if let Some(report) = reconstruct_trace(module, &solved, &hit) {
                reports.push(report);
            }
        }
        // One report per (source, sink) pair, independent of fact shape.
        reports.sort_by_key(|r| (r.source.inst, r.sink.inst));
        reports.dedup_by_key(|r| (r.source.inst, r.sink.inst));

        info!(reports = reports.len(), "taint analysis complete");
        Ok(TaintAnalysisOutcome {
            reports,
            stats: solved.stats,
            flags: solved.flags,
            wall_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Line-oriented report: a header followed by one block per flow with
    /// file:line pairs for every hop.
    pub fn render(outcome: &TaintAnalysisOutcome, module_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== taint analysis: {module_name} ==");
        let _ = writeln!(
            out,
            "time: {}ms  incomplete: {}  cancelled: {}",
            outcome.wall_ms, outcome.flags.incomplete, outcome.flags.cancelled
        );
        let _ = writeln!(out, "flows: {}", outcome.reports.len());
        for (i, report) in outcome.reports.iter().enumerate() {
            let _ = writeln!(
                out,
                "[{i}] {} -> {} ({})",
                report.source.inst, report.sink.inst, report.sink_function
            );
            for step in &report.steps {
                match &step.loc {
                    Some(loc) => {
                        let _ = writeln!(out, "    {} at {loc}", step.inst);
                    }
                    None => {
                        let _ = writeln!(out, "    {}", step.inst);
                    }
                }
            }
        }
        out
    }
}
