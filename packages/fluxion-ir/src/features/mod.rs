//! Feature modules, leaves first: the semiring interface and expression
//! algebra feed the NPA solver; the ICFG feeds the interprocedural
//! engine; IFDS/IDE and the PDG slicer sit on top.

pub mod expression;
pub mod icfg;
pub mod ifds;
pub mod interprocedural;
pub mod npa;
pub mod pdg;
pub mod semiring;
pub mod slicing;
pub mod taint_analysis;
