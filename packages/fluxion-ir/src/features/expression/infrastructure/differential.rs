/*
 * Differential Construction
 *
 * Builds the linear expression d(e) of a non-linear expression around the
 * current binding `nu`. Holes are the formal variables of the
 * linearization. The caller must have evaluated the expression under `nu`
 * first: the differential of a call reads the argument's cached value,
 * and the nondeterministic rule reads the cached branch and parent
 * values.
 */

use crate::features::expression::domain::{Exp0, ExprId, LinExprId};
use crate::features::expression::infrastructure::arena::ExprArena;
use crate::features::expression::infrastructure::eval::{Bindings, EvalCache};
use crate::features::semiring::Semiring;
use crate::shared::models::{FluxionError, Result};

/// Differentiate `root` with respect to every hole, allocating the linear
/// nodes into the same arena.
pub fn differentiate<D: Semiring>(
    dom: &D,
    arena: &mut ExprArena<D>,
    nu: &Bindings<D::Value>,
    root: ExprId,
    cache: &EvalCache<D::Value>,
) -> Result<LinExprId> {
    let node = arena.node(root).clone();
    match node {
        Exp0::Term(_) => {
            let z = dom.zero();
            Ok(arena.lin_term(z))
        }
        Exp0::Seq { first, rest } => {
            let d_rest = differentiate(dom, arena, nu, rest, cache)?;
            Ok(arena.lin_seq(first, d_rest))
        }
        Exp0::Call { callee, arg } => {
            // Product rule: ν[f]·d(arg) + Δf·arg.
            let f_val = nu.get(&callee).cloned().ok_or_else(|| {
                FluxionError::MalformedEquation(format!("unbound call target {callee}"))
            })?;
            let arg_val = cached(cache, arg)?;
            let d_arg = differentiate(dom, arena, nu, arg, cache)?;
            let left = arena.lin_seq(f_val, d_arg);
            let right = arena.lin_call(callee, arg_val);
            Ok(arena.lin_add(left, right))
        }
        Exp0::Cond {
            guard,
            then_e,
            else_e,
        } => {
            let d_then = differentiate(dom, arena, nu, then_e, cache)?;
            let d_else = differentiate(dom, arena, nu, else_e, cache)?;
            Ok(arena.lin_cond(guard, d_then, d_else))
        }
        Exp0::Ndet { left, right } => {
            // Each branch is augmented with its current base value so the
            // linear system never undershoots a branch already taken.
            let left_val = cached(cache, left)?;
            let right_val = cached(cache, right)?;
            let d_left = differentiate(dom, arena, nu, left, cache)?;
            let d_right = differentiate(dom, arena, nu, right, cache)?;
            let left_base = arena.lin_term(left_val);
            let right_base = arena.lin_term(right_val);
            let aug_left = arena.lin_add(left_base, d_left);
            let aug_right = arena.lin_add(right_base, d_right);
            let augmented = arena.lin_ndet(aug_left, aug_right);
            if D::IDEMPOTENT {
                Ok(augmented)
            } else {
                let parent_val = cached(cache, root)?;
                let parent_base = arena.lin_term(parent_val);
                Ok(arena.lin_sub(augmented, parent_base))
            }
        }
        Exp0::Hole(sym) => Ok(arena.lin_hole(sym)),
        Exp0::Concat { left, var, right } => {
            let d_left = differentiate(dom, arena, nu, left, cache)?;
            let d_right = differentiate(dom, arena, nu, right, cache)?;
            Ok(arena.lin_concat(d_left, var, d_right))
        }
        Exp0::Closure { body, var } => {
            let d_body = differentiate(dom, arena, nu, body, cache)?;
            Ok(arena.lin_closure(d_body, var))
        }
    }
}

fn cached<V: Clone>(cache: &EvalCache<V>, id: ExprId) -> Result<V> {
    cache.get(id).cloned().ok_or_else(|| {
        FluxionError::Internal(format!(
            "expression node {id:?} was not evaluated before differentiation"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::expression::domain::Exp1;
    use crate::features::expression::infrastructure::eval;
    use crate::features::semiring::{BoolDomain, Semiring};
    use crate::shared::models::SymbolTable;

    #[test]
    fn term_differentiates_to_zero() {
        let dom = BoolDomain;
        let mut arena: ExprArena<BoolDomain> = ExprArena::new();
        let t = arena.term(true);
        let mut cache = EvalCache::new();
        eval::eval(&dom, &arena, &Bindings::default(), &Bindings::default(), t, &mut cache)
            .unwrap();
        let d = differentiate(&dom, &mut arena, &Bindings::default(), t, &cache).unwrap();
        assert!(matches!(arena.lin_node(d), Exp1::Term(false)));
    }

    #[test]
    fn hole_stays_a_hole() {
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let x = syms.intern("x");
        let mut arena: ExprArena<BoolDomain> = ExprArena::new();
        let h = arena.hole(x);
        let mut env = Bindings::default();
        env.insert(x, false);
        let mut cache = EvalCache::new();
        eval::eval(&dom, &arena, &Bindings::default(), &env, h, &mut cache).unwrap();
        let d = differentiate(&dom, &mut arena, &Bindings::default(), h, &cache).unwrap();
        assert!(matches!(arena.lin_node(d), Exp1::Hole(s) if *s == x));
    }

    #[test]
    fn call_applies_product_rule() {
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let f = syms.intern("f");
        let mut arena: ExprArena<BoolDomain> = ExprArena::new();
        let arg = arena.term(true);
        let call = arena.call(f, arg);
        let mut nu = Bindings::default();
        nu.insert(f, false);
        let mut cache = EvalCache::new();
        eval::eval(&dom, &arena, &nu, &Bindings::default(), call, &mut cache).unwrap();
        let d = differentiate(&dom, &mut arena, &nu, call, &cache).unwrap();
        // Add(Seq(ν[f], d(arg)), Call(f, cached(arg)))
        let Exp1::Add { left, right } = arena.lin_node(d) else {
            panic!("expected Add at the root of a call differential");
        };
        assert!(matches!(arena.lin_node(*left), Exp1::Seq { .. }));
        assert!(
            matches!(arena.lin_node(*right), Exp1::Call { callee, arg } if *callee == f && *arg)
        );
    }

    #[test]
    fn missing_cache_is_an_error() {
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let f = syms.intern("f");
        let mut arena: ExprArena<BoolDomain> = ExprArena::new();
        let arg = arena.term(true);
        let call = arena.call(f, arg);
        let mut nu = Bindings::default();
        nu.insert(f, false);
        let cache = EvalCache::new();
        assert!(differentiate(&dom, &mut arena, &nu, call, &cache).is_err());
    }
}
