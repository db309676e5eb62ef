/*
 * Newton Iteration
 *
 * Each outer step linearizes every equation around the current binding,
 * solves the resulting linear system for the delta vector, and folds the
 * deltas back into the approximation. For idempotent domains the delta
 * replaces the previous value (combine is absorptive and the bases are
 * carried inside the differential); otherwise it accumulates via combine
 * and the base is the difference `eval - previous`.
 *
 * Reaches the least fixed point in at most n+1 steps for n variables on
 * idempotent domains.
 */

use crate::features::expression::infrastructure::differential::differentiate;
use crate::features::expression::infrastructure::eval::{self, Bindings, EvalCache};
use crate::features::npa::domain::{
    EquationSystem, LinearStrategy, Solution, SolverConfig, SolverStats,
};
use crate::features::npa::infrastructure::linear_solver::{solve_naive, solve_worklist};
use crate::features::semiring::Semiring;
use crate::shared::models::{Result, SolveFlags};
use std::time::Instant;
use tracing::debug;

pub fn solve_newton<D: Semiring>(
    dom: &D,
    system: &mut EquationSystem<D>,
    config: &SolverConfig,
) -> Result<Solution<D::Value>> {
    let started = Instant::now();
    let equations: Vec<_> = system.iter().collect();
    let mut bindings: Bindings<D::Value> = equations
        .iter()
        .map(|&(sym, _)| (sym, dom.zero()))
        .collect();

    let mut flags = SolveFlags::complete();
    let mut iterations = 0u32;
    let mut linear_steps = 0u64;

    loop {
        if let Some(cap) = config.max_iterations {
            if iterations >= cap {
                flags.incomplete = true;
                break;
            }
        }

        // 1. Evaluate and differentiate every equation around `bindings`.
        let mut rhs = Vec::with_capacity(equations.len());
        for &(sym, expr) in &equations {
            let mut cache = EvalCache::new();
            let value = eval::eval(dom, system.arena(), &bindings, &bindings, expr, &mut cache)?;
            let diff = differentiate(dom, system.arena_mut(), &bindings, expr, &cache)?;
            let base = if D::IDEMPOTENT {
                value
            } else {
                dom.subtract(&value, &bindings[&sym])
            };
            let arena = system.arena_mut();
            let base_term = arena.lin_term(base);
            rhs.push((sym, arena.lin_add(base_term, diff)));
        }

        // 2. Solve the linear system for the delta vector.
        let (delta, steps) = match config.linear_strategy {
            LinearStrategy::Naive => solve_naive(dom, system.arena(), &rhs, config.verbose)?,
            LinearStrategy::Worklist => solve_worklist(dom, system.arena(), &rhs, config.verbose)?,
        };
        linear_steps += steps;

        // 3. Fold deltas into the approximation.
        let mut stable = true;
        for (&(sym, _), d) in equations.iter().zip(delta.into_iter()) {
            let next = if D::IDEMPOTENT {
                d
            } else {
                dom.combine(&bindings[&sym], &d)
            };
            if !dom.equal(&bindings[&sym], &next) {
                stable = false;
            }
            bindings.insert(sym, next);
        }

        iterations += 1;
        if config.verbose {
            debug!(iterations, linear_steps, "newton step complete");
        }
        if stable {
            break;
        }
    }

    Ok(Solution {
        values: bindings,
        stats: SolverStats {
            iterations,
            linear_steps,
            elapsed: started.elapsed(),
        },
        flags,
    })
}
