//! Typed, memoized expression trees with differential construction.

pub mod domain;
pub mod infrastructure;

pub use domain::{Exp0, Exp1, ExprId, LinExprId};
pub use infrastructure::arena::ExprArena;
pub use infrastructure::deps::linear_deps;
pub use infrastructure::differential::differentiate;
pub use infrastructure::eval::{eval, eval_value, Bindings, EvalCache};
pub use infrastructure::linear_eval::eval_linear;
