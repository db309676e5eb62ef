/*
 * Kleene Iteration
 *
 * Fixpoint by repeated substitution: start every symbol at zero and
 * re-evaluate all right-hand sides against the previous round until
 * nothing changes. Convergence is guaranteed on ω-continuous semirings;
 * an optional cap turns non-terminating chains into a flagged partial
 * result.
 */

use crate::features::expression::infrastructure::eval::{self, Bindings, EvalCache};
use crate::features::npa::domain::{EquationSystem, Solution, SolverConfig, SolverStats};
use crate::features::semiring::Semiring;
use crate::shared::models::{Result, SolveFlags};
use std::time::Instant;
use tracing::debug;

pub fn solve_kleene<D: Semiring>(
    dom: &D,
    system: &EquationSystem<D>,
    config: &SolverConfig,
) -> Result<Solution<D::Value>> {
    let started = Instant::now();
    let mut bindings: Bindings<D::Value> =
        system.iter().map(|(sym, _)| (sym, dom.zero())).collect();

    let mut flags = SolveFlags::complete();
    let mut iterations = 0u32;
    loop {
        if let Some(cap) = config.max_iterations {
            if iterations >= cap {
                flags.incomplete = true;
                break;
            }
        }
        let mut next = bindings.clone();
        let mut stable = true;
        for (sym, expr) in system.iter() {
            let mut cache = EvalCache::new();
            let v = eval::eval(dom, system.arena(), &bindings, &bindings, expr, &mut cache)?;
            if !dom.equal(&bindings[&sym], &v) {
                stable = false;
            }
            next.insert(sym, v);
        }
        bindings = next;
        iterations += 1;
        if config.verbose {
            debug!(iterations, "kleene round complete");
        }
        if stable {
            break;
        }
    }

    Ok(Solution {
        values: bindings,
        stats: SolverStats {
            iterations,
            linear_steps: 0,
            elapsed: started.elapsed(),
        },
        flags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::semiring::{BoolDomain, Semiring};
    use crate::shared::models::SymbolTable;

    #[test]
    fn recursive_equation_reaches_top() {
        // X = ⊤·X ⊕ ⊤
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let x = syms.intern("X");
        let mut system = EquationSystem::new();
        let hole = system.arena_mut().hole(x);
        let step = system.arena_mut().seq(true, hole);
        let base = system.arena_mut().term(true);
        let rhs = system.arena_mut().ndet(step, base);
        system.define(x, rhs).unwrap();

        let solution = solve_kleene(&dom, &system, &SolverConfig::default()).unwrap();
        assert_eq!(solution.value(x), Some(&true));
        assert!(!solution.flags.is_partial());
    }

    #[test]
    fn iteration_cap_marks_incomplete() {
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let x = syms.intern("X");
        let mut system = EquationSystem::new();
        let hole = system.arena_mut().hole(x);
        let step = system.arena_mut().seq(true, hole);
        let base = system.arena_mut().term(true);
        let rhs = system.arena_mut().ndet(step, base);
        system.define(x, rhs).unwrap();

        let config = SolverConfig {
            max_iterations: Some(0),
            ..Default::default()
        };
        let solution = solve_kleene(&dom, &system, &config).unwrap();
        assert!(solution.flags.incomplete);
    }
}
