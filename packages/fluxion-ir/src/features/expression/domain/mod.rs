/*
 * Expression Trees
 *
 * Two parallel shapes: non-linear expressions (`Exp0`) built by the
 * interprocedural engine, and linear expressions (`Exp1`) produced by
 * differentiation. Nodes live in an arena and reference each other by
 * index, so sharing is structural and lifetimes are owned by the arena.
 * Memoization lives in the evaluator, keyed by node index, not on the
 * nodes themselves.
 */

use crate::features::semiring::Semiring;
use crate::shared::models::Symbol;
use serde::{Deserialize, Serialize};

/// Index of a non-linear expression node in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u32);

/// Index of a linear expression node in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinExprId(pub u32);

/// Non-linear expression node.
#[derive(Debug)]
pub enum Exp0<D: Semiring> {
    /// Constant domain value.
    Term(D::Value),
    /// `extend(first, rest)`.
    Seq { first: D::Value, rest: ExprId },
    /// `extend(ν[callee], arg)`, referencing another equation's value.
    Call { callee: Symbol, arg: ExprId },
    /// Guarded choice on `guard`.
    Cond {
        guard: D::Test,
        then_e: ExprId,
        else_e: ExprId,
    },
    /// Nondeterministic choice.
    Ndet { left: ExprId, right: ExprId },
    /// Formal variable resolved from the hole environment.
    Hole(Symbol),
    /// Evaluate `right`, bind it to `var`, then evaluate `left`.
    Concat {
        left: ExprId,
        var: Symbol,
        right: ExprId,
    },
    /// Least fixed point of `body` in `var`, starting from zero.
    Closure { body: ExprId, var: Symbol },
}

/// Linear expression node: the `Exp0` shapes plus `Add`/`Sub`, with `Call`
/// carrying a pre-evaluated argument constant.
#[derive(Debug)]
pub enum Exp1<D: Semiring> {
    Term(D::Value),
    Seq { first: D::Value, rest: LinExprId },
    /// `extend(ν[callee], arg)` with `arg` already a constant.
    Call { callee: Symbol, arg: D::Value },
    Cond {
        guard: D::Test,
        then_e: LinExprId,
        else_e: LinExprId,
    },
    Ndet { left: LinExprId, right: LinExprId },
    Hole(Symbol),
    Concat {
        left: LinExprId,
        var: Symbol,
        right: LinExprId,
    },
    Closure { body: LinExprId, var: Symbol },
    Add { left: LinExprId, right: LinExprId },
    Sub { left: LinExprId, right: LinExprId },
}

// Manual Clone impls: the derive would demand `D: Clone`, but only the
// associated value/test types are stored in nodes.
impl<D: Semiring> Clone for Exp0<D> {
    fn clone(&self) -> Self {
        match self {
            Exp0::Term(v) => Exp0::Term(v.clone()),
            Exp0::Seq { first, rest } => Exp0::Seq {
                first: first.clone(),
                rest: *rest,
            },
            Exp0::Call { callee, arg } => Exp0::Call {
                callee: *callee,
                arg: *arg,
            },
            Exp0::Cond {
                guard,
                then_e,
                else_e,
            } => Exp0::Cond {
                guard: guard.clone(),
                then_e: *then_e,
                else_e: *else_e,
            },
            Exp0::Ndet { left, right } => Exp0::Ndet {
                left: *left,
                right: *right,
            },
            Exp0::Hole(sym) => Exp0::Hole(*sym),
            Exp0::Concat { left, var, right } => Exp0::Concat {
                left: *left,
                var: *var,
                right: *right,
            },
            Exp0::Closure { body, var } => Exp0::Closure {
                body: *body,
                var: *var,
            },
        }
    }
}

impl<D: Semiring> Clone for Exp1<D> {
    fn clone(&self) -> Self {
        match self {
            Exp1::Term(v) => Exp1::Term(v.clone()),
            Exp1::Seq { first, rest } => Exp1::Seq {
                first: first.clone(),
                rest: *rest,
            },
            Exp1::Call { callee, arg } => Exp1::Call {
                callee: *callee,
                arg: arg.clone(),
            },
            Exp1::Cond {
                guard,
                then_e,
                else_e,
            } => Exp1::Cond {
                guard: guard.clone(),
                then_e: *then_e,
                else_e: *else_e,
            },
            Exp1::Ndet { left, right } => Exp1::Ndet {
                left: *left,
                right: *right,
            },
            Exp1::Hole(sym) => Exp1::Hole(*sym),
            Exp1::Concat { left, var, right } => Exp1::Concat {
                left: *left,
                var: *var,
                right: *right,
            },
            Exp1::Closure { body, var } => Exp1::Closure {
                body: *body,
                var: *var,
            },
            Exp1::Add { left, right } => Exp1::Add {
                left: *left,
                right: *right,
            },
            Exp1::Sub { left, right } => Exp1::Sub {
                left: *left,
                right: *right,
            },
        }
    }
}
