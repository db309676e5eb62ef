//! Interprocedural finite-distributive subset problems solved by graph
//! reachability over an implicit exploded supergraph, with an IDE value
//! layer on top.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    ExplodedEdge, ExplodedEdgeKind, FlowFact, IfdsConfig, IfdsResult, IfdsStats, PathEdge,
};
pub use infrastructure::const_prop::{ConstEdge, ConstFact, ConstValue, ConstantPropagation};
pub use infrastructure::graph::{CallSite, SupergraphSkeleton};
pub use infrastructure::ide::{solve_ide, IdeResult};
pub use infrastructure::solver::IfdsSolver;
pub use ports::{IdeProblem, IfdsProblem};
