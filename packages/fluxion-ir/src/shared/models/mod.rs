//! Shared data models: symbols, contexts, the normalized IR, errors and
//! solver budgets. Everything downstream of `features/` depends on these.

pub mod budget;
pub mod context;
pub mod error;
pub mod ir;
pub mod span;
pub mod symbol;

pub use budget::{CancelToken, ProgressFn, SolveFlags, StepBudget};
pub use context::CallString;
pub use error::{FluxionError, Result};
pub use ir::{
    Block, BlockId, Callee, DefSite, Function, GlobalVar, Inst, InstId, InstKind, Module,
    ModuleIndex, ValueId,
};
pub use span::SourceLoc;
pub use symbol::{Symbol, SymbolTable};
