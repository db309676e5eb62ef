//! PDG traversals: forward/backward slicing, chopping with bounded path
//! enumeration, and thin slicing with Dyck call/return matching.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::SlicingService;
pub use domain::{
    ChopConfig, ChopDiagnostics, ChopResult, SliceConfig, SliceDiagnostics, SliceResult,
    ThinSliceConfig, ThinSliceDiagnostics, ThinSliceResult,
};
pub use infrastructure::slicer::ProgramSlicer;
pub use infrastructure::thin::ThinSlicer;
