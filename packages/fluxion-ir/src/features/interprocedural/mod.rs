//! k-CFA context-sensitive driver: builds an equation system from the
//! ICFG, solves it with Newton, and propagates entry facts top-down.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{EngineConfig, EngineResult};
pub use infrastructure::engine::InterproceduralEngine;
pub use infrastructure::reaching_defs::ReachingDefs;
pub use infrastructure::taint_client::{NpaSinkHit, NpaTaint, NpaTaintResult};
pub use ports::TransferFactory;
