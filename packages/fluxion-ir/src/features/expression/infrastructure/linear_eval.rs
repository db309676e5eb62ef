/*
 * Linear Interpreter
 *
 * Inner kernel of the Newton step. Identical recursion to the non-linear
 * interpreter plus `Add`/`Sub`, with `Call` reading a pre-evaluated
 * argument constant. No cross-call memoization: the linear solver
 * re-evaluates under a changing delta binding, so every call sees fresh
 * state.
 */

use crate::features::expression::domain::{Exp1, LinExprId};
use crate::features::expression::infrastructure::arena::ExprArena;
use crate::features::expression::infrastructure::eval::Bindings;
use crate::features::semiring::Semiring;
use crate::shared::models::{FluxionError, Result, Symbol};

/// Evaluate a linear expression. `nu` resolves `Call` targets (the delta
/// variables during a Newton step) and `env` resolves holes.
pub fn eval_linear<D: Semiring>(
    dom: &D,
    arena: &ExprArena<D>,
    nu: &Bindings<D::Value>,
    env: &Bindings<D::Value>,
    root: LinExprId,
) -> Result<D::Value> {
    match arena.lin_node(root) {
        Exp1::Term(v) => Ok(v.clone()),
        Exp1::Seq { first, rest } => {
            let tail = eval_linear(dom, arena, nu, env, *rest)?;
            Ok(dom.extend_lin(first, &tail))
        }
        Exp1::Call { callee, arg } => {
            let f = nu
                .get(callee)
                .ok_or_else(|| unbound("call target", *callee))?;
            Ok(dom.extend_lin(f, arg))
        }
        Exp1::Cond {
            guard,
            then_e,
            else_e,
        } => {
            let t = eval_linear(dom, arena, nu, env, *then_e)?;
            let e = eval_linear(dom, arena, nu, env, *else_e)?;
            Ok(dom.cond_combine(guard, &t, &e))
        }
        Exp1::Ndet { left, right } => {
            let l = eval_linear(dom, arena, nu, env, *left)?;
            let r = eval_linear(dom, arena, nu, env, *right)?;
            Ok(dom.ndet_combine(&l, &r))
        }
        Exp1::Hole(sym) => env.get(sym).cloned().ok_or_else(|| unbound("hole", *sym)),
        Exp1::Concat { left, var, right } => {
            let rv = eval_linear(dom, arena, nu, env, *right)?;
            let mut inner = env.clone();
            inner.insert(*var, rv);
            eval_linear(dom, arena, nu, &inner, *left)
        }
        Exp1::Closure { body, var } => {
            let mut cur = dom.zero();
            loop {
                let mut inner = env.clone();
                inner.insert(*var, cur.clone());
                let next = eval_linear(dom, arena, nu, &inner, *body)?;
                if dom.equal(&cur, &next) {
                    return Ok(cur);
                }
                cur = next;
            }
        }
        Exp1::Add { left, right } => {
            let l = eval_linear(dom, arena, nu, env, *left)?;
            let r = eval_linear(dom, arena, nu, env, *right)?;
            Ok(dom.combine(&l, &r))
        }
        Exp1::Sub { left, right } => {
            let l = eval_linear(dom, arena, nu, env, *left)?;
            let r = eval_linear(dom, arena, nu, env, *right)?;
            Ok(dom.subtract(&l, &r))
        }
    }
}

fn unbound(what: &str, sym: Symbol) -> FluxionError {
    FluxionError::MalformedEquation(format!("unbound {what} {sym} in linear system"))
}
