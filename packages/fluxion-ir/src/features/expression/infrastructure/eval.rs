/*
 * Non-linear Interpreter
 *
 * Computes a domain value for an expression under a symbol binding `nu`
 * (resolving `Call`) and a hole environment `env` (resolving `Hole`).
 * Memoizing: results are cached per node index in an evaluator-owned
 * cache whose lifetime is one top-level `eval` call. Closure bodies are
 * re-evaluated per fixpoint round, so their subtree cache entries are
 * invalidated between rounds.
 *
 * Unbound `Call` or `Hole` symbols are a fatal malformed-equation error.
 */

use crate::features::expression::domain::{Exp0, ExprId};
use crate::features::expression::infrastructure::arena::ExprArena;
use crate::features::semiring::Semiring;
use crate::shared::models::{FluxionError, Result, Symbol};
use rustc_hash::FxHashMap;

/// Symbol-to-value binding used for both `nu` and hole environments.
pub type Bindings<V> = FxHashMap<Symbol, V>;

/// Per-evaluation memo table, keyed by node index. Exposed so the
/// differential builder can read sub-expression values after an `eval`.
#[derive(Debug)]
pub struct EvalCache<V> {
    values: FxHashMap<u32, V>,
}

impl<V> Default for EvalCache<V> {
    fn default() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }
}

impl<V: Clone> EvalCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ExprId) -> Option<&V> {
        self.values.get(&id.0)
    }

    fn insert(&mut self, id: ExprId, v: V) {
        self.values.insert(id.0, v);
    }

    fn remove(&mut self, id: ExprId) {
        self.values.remove(&id.0);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Evaluate `root` under `nu` and `env`, filling `cache` as a side effect.
pub fn eval<D: Semiring>(
    dom: &D,
    arena: &ExprArena<D>,
    nu: &Bindings<D::Value>,
    env: &Bindings<D::Value>,
    root: ExprId,
    cache: &mut EvalCache<D::Value>,
) -> Result<D::Value> {
    rec(dom, arena, nu, env, root, cache)
}

/// Convenience entry that discards the cache.
pub fn eval_value<D: Semiring>(
    dom: &D,
    arena: &ExprArena<D>,
    nu: &Bindings<D::Value>,
    env: &Bindings<D::Value>,
    root: ExprId,
) -> Result<D::Value> {
    let mut cache = EvalCache::new();
    eval(dom, arena, nu, env, root, &mut cache)
}

fn rec<D: Semiring>(
    dom: &D,
    arena: &ExprArena<D>,
    nu: &Bindings<D::Value>,
    env: &Bindings<D::Value>,
    id: ExprId,
    cache: &mut EvalCache<D::Value>,
) -> Result<D::Value> {
    if let Some(v) = cache.get(id) {
        return Ok(v.clone());
    }
    let v = match arena.node(id) {
        Exp0::Term(v) => v.clone(),
        Exp0::Seq { first, rest } => {
            let first = first.clone();
            let tail = rec(dom, arena, nu, env, *rest, cache)?;
            dom.extend(&first, &tail)
        }
        Exp0::Call { callee, arg } => {
            let callee = *callee;
            let arg = *arg;
            let f = nu
                .get(&callee)
                .cloned()
                .ok_or_else(|| unbound("call target", callee))?;
            let a = rec(dom, arena, nu, env, arg, cache)?;
            dom.extend(&f, &a)
        }
        Exp0::Cond {
            guard,
            then_e,
            else_e,
        } => {
            let guard = guard.clone();
            let (then_e, else_e) = (*then_e, *else_e);
            let t = rec(dom, arena, nu, env, then_e, cache)?;
            let e = rec(dom, arena, nu, env, else_e, cache)?;
            dom.cond_combine(&guard, &t, &e)
        }
        Exp0::Ndet { left, right } => {
            let (left, right) = (*left, *right);
            let l = rec(dom, arena, nu, env, left, cache)?;
            let r = rec(dom, arena, nu, env, right, cache)?;
            dom.ndet_combine(&l, &r)
        }
        Exp0::Hole(sym) => env
            .get(sym)
            .cloned()
            .ok_or_else(|| unbound("hole", *sym))?,
        Exp0::Concat { left, var, right } => {
            let (left, var, right) = (*left, *var, *right);
            let rv = rec(dom, arena, nu, env, right, cache)?;
            let mut inner = env.clone();
            inner.insert(var, rv);
            rec(dom, arena, nu, &inner, left, cache)?
        }
        Exp0::Closure { body, var } => {
            let (body, var) = (*body, *var);
            let mut cur = dom.zero();
            loop {
                invalidate_subtree(arena, body, cache);
                let mut inner = env.clone();
                inner.insert(var, cur.clone());
                let next = rec(dom, arena, nu, &inner, body, cache)?;
                if dom.equal(&cur, &next) {
                    break;
                }
                cur = next;
            }
            cur
        }
    };
    cache.insert(id, v.clone());
    Ok(v)
}

/// Drop cached values for a subtree so a new hole binding is observed.
fn invalidate_subtree<D: Semiring>(
    arena: &ExprArena<D>,
    id: ExprId,
    cache: &mut EvalCache<D::Value>,
) {
    cache.remove(id);
    match arena.node(id) {
        Exp0::Term(_) | Exp0::Hole(_) => {}
        Exp0::Seq { rest, .. } => invalidate_subtree(arena, *rest, cache),
        Exp0::Call { arg, .. } => invalidate_subtree(arena, *arg, cache),
        Exp0::Cond { then_e, else_e, .. } => {
            invalidate_subtree(arena, *then_e, cache);
            invalidate_subtree(arena, *else_e, cache);
        }
        Exp0::Ndet { left, right } | Exp0::Concat { left, right, .. } => {
            invalidate_subtree(arena, *left, cache);
            invalidate_subtree(arena, *right, cache);
        }
        Exp0::Closure { body, .. } => invalidate_subtree(arena, *body, cache),
    }
}

fn unbound(what: &str, sym: Symbol) -> FluxionError {
    FluxionError::MalformedEquation(format!("unbound {what} {sym}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::semiring::{BoolDomain, Semiring, TropicalDomain};
    use crate::shared::models::SymbolTable;

    #[test]
    fn seq_extends_after_tail() {
        let dom = TropicalDomain;
        let mut arena = ExprArena::new();
        let t = arena.term(TropicalDomain::weight(3));
        let s = arena.seq(TropicalDomain::weight(2), t);
        let v = eval_value(&dom, &arena, &Bindings::default(), &Bindings::default(), s).unwrap();
        assert_eq!(v, Some(5));
    }

    #[test]
    fn unbound_hole_is_fatal() {
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let x = syms.intern("x");
        let mut arena = ExprArena::new();
        let h = arena.hole(x);
        let err =
            eval_value(&dom, &arena, &Bindings::default(), &Bindings::default(), h).unwrap_err();
        assert!(matches!(err, FluxionError::MalformedEquation(_)));
    }

    #[test]
    fn concat_binds_hole_locally() {
        let dom = TropicalDomain;
        let mut syms = SymbolTable::new();
        let x = syms.intern("x");
        let mut arena = ExprArena::new();
        let h = arena.hole(x);
        let left = arena.seq(TropicalDomain::weight(1), h);
        let right = arena.term(TropicalDomain::weight(4));
        let c = arena.concat(left, x, right);
        let v = eval_value(&dom, &arena, &Bindings::default(), &Bindings::default(), c).unwrap();
        assert_eq!(v, Some(5));
    }

    #[test]
    fn closure_reaches_fixpoint() {
        // μc. (⊤ · c) ∨ ⊤  over the boolean semiring is ⊤.
        let dom = BoolDomain;
        let mut syms = SymbolTable::new();
        let x = syms.intern("x");
        let mut arena = ExprArena::new();
        let h = arena.hole(x);
        let step = arena.seq(true, h);
        let base = arena.term(true);
        let body = arena.ndet(step, base);
        let clos = arena.closure(body, x);
        let v =
            eval_value(&dom, &arena, &Bindings::default(), &Bindings::default(), clos).unwrap();
        assert!(v);
    }

    #[test]
    fn call_reads_nu() {
        let dom = TropicalDomain;
        let mut syms = SymbolTable::new();
        let f = syms.intern("f");
        let mut arena = ExprArena::new();
        let arg = arena.term(dom.one());
        let call = arena.call(f, arg);
        let mut nu = Bindings::default();
        nu.insert(f, TropicalDomain::weight(7));
        let v = eval_value(&dom, &arena, &nu, &Bindings::default(), call).unwrap();
        assert_eq!(v, Some(7));
    }

    #[test]
    fn cache_holds_subexpression_values() {
        let dom = TropicalDomain;
        let mut arena = ExprArena::new();
        let t = arena.term(TropicalDomain::weight(3));
        let s = arena.seq(TropicalDomain::weight(2), t);
        let mut cache = EvalCache::new();
        eval(&dom, &arena, &Bindings::default(), &Bindings::default(), s, &mut cache).unwrap();
        assert_eq!(cache.get(t), Some(&Some(3)));
        assert_eq!(cache.get(s), Some(&Some(5)));
    }
}
