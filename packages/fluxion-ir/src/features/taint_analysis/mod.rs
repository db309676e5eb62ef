//! IFDS taint client: specification-driven sources, sinks, pipes and
//! sanitization, memory via an external alias oracle, trace reporting.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{TaintAnalysisOutcome, TaintAnalysisService};
pub use domain::{
    AccessMode, FunctionTaintSpec, PipeSpec, Position, TaintFact, TaintPos, TaintReport,
    TaintSpecConfig, TraceStep,
};
pub use infrastructure::analysis::{find_sink_hits, reconstruct_trace, SinkHit, TaintProblem};
pub use infrastructure::spec_parser::{parse_file, parse_str};
pub use ports::{AliasOracle, ClassAliasOracle, IdentityAliasOracle};
