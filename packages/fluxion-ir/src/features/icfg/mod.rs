//! Interprocedural control-flow graph with explicit call/return edges.

pub mod domain;
pub mod infrastructure;

pub use domain::{IcfgEdge, IcfgNode, IcfgNodeKind};
pub use infrastructure::analysis::{
    distance_map, find_intra_backedges, is_reachable, shortest_path_intra,
};
pub use infrastructure::builder::build_icfg;
pub use infrastructure::graph::Icfg;
