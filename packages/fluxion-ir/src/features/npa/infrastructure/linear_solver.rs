/*
 * Linear Subsolvers
 *
 * Solve Δ = L(Δ) + b where L is encoded by a vector of linear
 * expressions, one per delta variable. Two strategies:
 *
 *   Naive:    whole-vector substitution until the vector stabilizes.
 *   Worklist: dependency-driven, an equation re-evaluates only when one
 *             of the symbols it mentions changed; users re-enqueue on
 *             update.
 *
 * Both bind the delta variables into `nu` (for Call nodes) and the hole
 * environment simultaneously, since a delta variable can be referenced
 * either way.
 */

use crate::features::expression::infrastructure::arena::ExprArena;
use crate::features::expression::infrastructure::deps::linear_deps;
use crate::features::expression::infrastructure::eval::Bindings;
use crate::features::expression::infrastructure::linear_eval::eval_linear;
use crate::features::expression::LinExprId;
use crate::features::semiring::Semiring;
use crate::shared::models::{Result, Symbol};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::debug;

/// Solve by repeated substitution. Returns the solution vector in the
/// order of `rhs` and the number of full rounds performed.
pub fn solve_naive<D: Semiring>(
    dom: &D,
    arena: &ExprArena<D>,
    rhs: &[(Symbol, LinExprId)],
    verbose: bool,
) -> Result<(Vec<D::Value>, u64)> {
    let mut current: Vec<D::Value> = rhs.iter().map(|_| dom.zero()).collect();
    let mut rounds = 0u64;
    loop {
        let env: Bindings<D::Value> = rhs
            .iter()
            .zip(current.iter())
            .map(|(&(sym, _), v)| (sym, v.clone()))
            .collect();
        let mut next = Vec::with_capacity(rhs.len());
        for &(_, expr) in rhs {
            next.push(eval_linear(dom, arena, &env, &env, expr)?);
        }
        rounds += 1;
        let stable = current
            .iter()
            .zip(next.iter())
            .all(|(a, b)| dom.equal(a, b));
        current = next;
        if stable {
            if verbose {
                debug!(rounds, "naive linear solve converged");
            }
            return Ok((current, rounds));
        }
    }
}

/// Dependency-driven solve. Returns the solution vector and the number of
/// worklist steps.
pub fn solve_worklist<D: Semiring>(
    dom: &D,
    arena: &ExprArena<D>,
    rhs: &[(Symbol, LinExprId)],
    verbose: bool,
) -> Result<(Vec<D::Value>, u64)> {
    let mut sym_to_idx: FxHashMap<Symbol, usize> = FxHashMap::default();
    let mut env: Bindings<D::Value> = Bindings::default();
    for (i, &(sym, _)) in rhs.iter().enumerate() {
        sym_to_idx.insert(sym, i);
        env.insert(sym, dom.zero());
    }

    // users[i] = equations that mention rhs[i]'s symbol.
    let mut users: Vec<Vec<usize>> = vec![Vec::new(); rhs.len()];
    for (i, &(_, expr)) in rhs.iter().enumerate() {
        for dep in linear_deps(arena, expr) {
            if let Some(&j) = sym_to_idx.get(&dep) {
                users[j].push(i);
            }
        }
    }

    let mut worklist: VecDeque<usize> = (0..rhs.len()).collect();
    let mut queued = vec![true; rhs.len()];
    let mut values: Vec<D::Value> = rhs.iter().map(|_| dom.zero()).collect();

    let mut steps = 0u64;
    while let Some(idx) = worklist.pop_front() {
        queued[idx] = false;
        steps += 1;

        let (sym, expr) = rhs[idx];
        let new_val = eval_linear(dom, arena, &env, &env, expr)?;
        if !dom.equal(&values[idx], &new_val) {
            env.insert(sym, new_val.clone());
            values[idx] = new_val;
            for &user in &users[idx] {
                if !queued[user] {
                    worklist.push_back(user);
                    queued[user] = true;
                }
            }
        }
    }
    if verbose {
        debug!(steps, "worklist linear solve converged");
    }
    Ok((values, steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::semiring::{Semiring, TropicalDomain};
    use crate::shared::models::SymbolTable;

    // Δx = 2 + Δy ⊓ 5, Δy = 1 + Δx ⊓ 10 in the tropical semiring.
    fn cyclic_system(
        arena: &mut ExprArena<TropicalDomain>,
        syms: &mut SymbolTable,
    ) -> Vec<(Symbol, LinExprId)> {
        let x = syms.intern("dx");
        let y = syms.intern("dy");
        let hy = arena.lin_hole(y);
        let via_y = arena.lin_seq(TropicalDomain::weight(2), hy);
        let base_x = arena.lin_term(TropicalDomain::weight(5));
        let rhs_x = arena.lin_add(via_y, base_x);
        let hx = arena.lin_hole(x);
        let via_x = arena.lin_seq(TropicalDomain::weight(1), hx);
        let base_y = arena.lin_term(TropicalDomain::weight(10));
        let rhs_y = arena.lin_add(via_x, base_y);
        vec![(x, rhs_x), (y, rhs_y)]
    }

    #[test]
    fn naive_and_worklist_agree() {
        let dom = TropicalDomain;
        let mut syms = SymbolTable::new();
        let mut arena = ExprArena::new();
        let rhs = cyclic_system(&mut arena, &mut syms);

        let (naive, _) = solve_naive(&dom, &arena, &rhs, false).unwrap();
        let (worklist, _) = solve_worklist(&dom, &arena, &rhs, false).unwrap();
        assert_eq!(naive, worklist);
        assert_eq!(naive, vec![Some(5), Some(6)]);
    }
}
