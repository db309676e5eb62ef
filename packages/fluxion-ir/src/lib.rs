/*
 * Fluxion IR - Interprocedural Dataflow Analysis Core
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Symbol, CallString, IR, errors, budgets)
 * - features/    : Vertical slices (semiring → expression → npa → icfg →
 *                  interprocedural → ifds → taint → pdg → slicing)
 *
 * Three coordinated engines over one substrate:
 * - Newtonian program analysis: fixpoints over arbitrary semirings via
 *   Kleene or Newton iteration with a worklist linear subsolver
 * - IFDS/IDE: exploded-supergraph reachability with fact-indexed
 *   summaries and an optional value lattice
 * - PDG slicing: forward/backward/thin/chop traversals over typed
 *   dependence edges with Dyck call/return matching
 */

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::new_without_default)]

pub mod features;
pub mod shared;

// Flat re-exports for the common entry points.
pub use features::icfg::{build_icfg, Icfg, IcfgEdge, IcfgNode, IcfgNodeKind};
pub use features::ifds::{
    solve_ide, FlowFact, IdeProblem, IfdsConfig, IfdsProblem, IfdsResult, IfdsSolver,
    SupergraphSkeleton,
};
pub use features::interprocedural::{
    EngineConfig, EngineResult, InterproceduralEngine, NpaTaint, ReachingDefs, TransferFactory,
};
pub use features::npa::{
    solve_kleene, solve_newton, EquationSystem, LinearStrategy, Solution, SolverConfig,
};
pub use features::pdg::{Pdg, PdgBuilder, PdgEdgeKind, PdgNode, PdgNodeKey};
pub use features::semiring::{
    BoolDomain, CountingDomain, GenKillDomain, GenKillTransfer, Semiring, TaintTransfer,
    TaintTransferDomain, TropicalDomain,
};
pub use features::slicing::{
    ChopConfig, ProgramSlicer, SliceConfig, SlicingService, ThinSliceConfig, ThinSlicer,
};
pub use features::taint_analysis::{
    IdentityAliasOracle, TaintAnalysisService, TaintFact, TaintReport, TaintSpecConfig,
};
pub use shared::models::{
    CallString, CancelToken, FluxionError, Module, ModuleIndex, Result, SolveFlags, StepBudget,
    Symbol, SymbolTable,
};
