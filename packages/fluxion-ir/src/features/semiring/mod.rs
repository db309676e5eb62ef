//! Semiring domain interface and the domains shipped with the crate.

pub mod domain;

pub use domain::{
    BoolDomain, CountingDomain, GenKillDomain, GenKillTransfer, Semiring, TaintTransfer,
    TaintTransferDomain, TropicalDomain,
};
