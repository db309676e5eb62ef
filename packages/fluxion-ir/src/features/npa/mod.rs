//! Newtonian program analysis: Kleene and Newton fixpoint solvers over
//! equation systems in any conforming semiring.

pub mod domain;
pub mod infrastructure;

pub use domain::{EquationSystem, LinearStrategy, Solution, SolverConfig, SolverStats};
pub use infrastructure::kleene::solve_kleene;
pub use infrastructure::linear_solver::{solve_naive, solve_worklist};
pub use infrastructure::newton::solve_newton;
