/*
 * Equation Systems and Solver Configuration
 *
 * An equation system is an ordered sequence of (symbol, expression) pairs
 * over one arena; duplicate symbols are rejected at definition time. A
 * solution maps every defined symbol to a domain value and carries the
 * iteration statistics and completion flags.
 */

use crate::features::expression::{ExprArena, ExprId};
use crate::features::semiring::Semiring;
use crate::shared::models::{FluxionError, Result, SolveFlags, Symbol};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::time::Duration;

/// Strategy for the inner linear subsolver of a Newton step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearStrategy {
    /// Repeated whole-vector substitution until convergence.
    Naive,
    /// Dependency-driven: only equations whose inputs changed re-evaluate.
    #[default]
    Worklist,
}

#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    pub linear_strategy: LinearStrategy,
    /// Outer-loop cap; `None` iterates to fixpoint.
    pub max_iterations: Option<u32>,
    /// Emit per-iteration diagnostics through `tracing`.
    pub verbose: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    pub iterations: u32,
    pub linear_steps: u64,
    pub elapsed: Duration,
}

/// Result of a solve: one value per defined symbol.
#[derive(Debug, Clone)]
pub struct Solution<V> {
    pub values: FxHashMap<Symbol, V>,
    pub stats: SolverStats,
    pub flags: SolveFlags,
}

impl<V> Solution<V> {
    pub fn value(&self, sym: Symbol) -> Option<&V> {
        self.values.get(&sym)
    }
}

/// Ordered equation system over a shared expression arena.
#[derive(Debug)]
pub struct EquationSystem<D: Semiring> {
    arena: ExprArena<D>,
    equations: IndexMap<Symbol, ExprId>,
}

impl<D: Semiring> Default for EquationSystem<D> {
    fn default() -> Self {
        Self {
            arena: ExprArena::new(),
            equations: IndexMap::new(),
        }
    }
}

impl<D: Semiring> EquationSystem<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &ExprArena<D> {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut ExprArena<D> {
        &mut self.arena
    }

    /// Define `sym = expr`. Duplicate symbols are a malformed system.
    pub fn define(&mut self, sym: Symbol, expr: ExprId) -> Result<()> {
        if self.equations.contains_key(&sym) {
            return Err(FluxionError::MalformedEquation(format!(
                "duplicate equation symbol {sym}"
            )));
        }
        self.equations.insert(sym, expr);
        Ok(())
    }

    /// Replace the right-hand side of an already-defined symbol.
    pub fn replace(&mut self, sym: Symbol, expr: ExprId) -> Result<()> {
        match self.equations.get_mut(&sym) {
            Some(slot) => {
                *slot = expr;
                Ok(())
            }
            None => Err(FluxionError::MalformedEquation(format!(
                "cannot replace undefined symbol {sym}"
            ))),
        }
    }

    pub fn contains(&self, sym: Symbol) -> bool {
        self.equations.contains_key(&sym)
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    /// Equations in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, ExprId)> + '_ {
        self.equations.iter().map(|(&s, &e)| (s, e))
    }
}
