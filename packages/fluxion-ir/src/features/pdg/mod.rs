//! Program dependence graph over IR values with typed data, control and
//! parameter-passing edges.

pub mod domain;
pub mod infrastructure;

pub use domain::{OperandRole, PdgEdgeKind, PdgNode, PdgNodeKey};
pub use infrastructure::builder::PdgBuilder;
pub use infrastructure::graph::Pdg;
