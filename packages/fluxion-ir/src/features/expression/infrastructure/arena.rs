/*
 * Expression Arena
 *
 * Owns all expression nodes of one equation system. Factory methods mirror
 * the node variants; indices returned are valid for the arena's lifetime.
 * The arena holds both the non-linear nodes and the linear nodes created
 * during differentiation, so a Newton step allocates into the same arena
 * it reads from.
 */

use crate::features::expression::domain::{Exp0, Exp1, ExprId, LinExprId};
use crate::features::semiring::Semiring;
use crate::shared::models::Symbol;

#[derive(Debug)]
pub struct ExprArena<D: Semiring> {
    nodes: Vec<Exp0<D>>,
    lin_nodes: Vec<Exp1<D>>,
}

impl<D: Semiring> Default for ExprArena<D> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            lin_nodes: Vec::new(),
        }
    }
}

impl<D: Semiring> ExprArena<D> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Exp0<D>) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn push_lin(&mut self, node: Exp1<D>) -> LinExprId {
        let id = LinExprId(self.lin_nodes.len() as u32);
        self.lin_nodes.push(node);
        id
    }

    pub fn node(&self, id: ExprId) -> &Exp0<D> {
        &self.nodes[id.0 as usize]
    }

    pub fn lin_node(&self, id: LinExprId) -> &Exp1<D> {
        &self.lin_nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Non-linear factories.

    pub fn term(&mut self, v: D::Value) -> ExprId {
        self.push(Exp0::Term(v))
    }

    pub fn seq(&mut self, first: D::Value, rest: ExprId) -> ExprId {
        self.push(Exp0::Seq { first, rest })
    }

    pub fn call(&mut self, callee: Symbol, arg: ExprId) -> ExprId {
        self.push(Exp0::Call { callee, arg })
    }

    pub fn cond(&mut self, guard: D::Test, then_e: ExprId, else_e: ExprId) -> ExprId {
        self.push(Exp0::Cond {
            guard,
            then_e,
            else_e,
        })
    }

    pub fn ndet(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.push(Exp0::Ndet { left, right })
    }

    pub fn hole(&mut self, sym: Symbol) -> ExprId {
        self.push(Exp0::Hole(sym))
    }

    pub fn concat(&mut self, left: ExprId, var: Symbol, right: ExprId) -> ExprId {
        self.push(Exp0::Concat { left, var, right })
    }

    pub fn closure(&mut self, body: ExprId, var: Symbol) -> ExprId {
        self.push(Exp0::Closure { body, var })
    }

    // Linear factories.

    pub fn lin_term(&mut self, v: D::Value) -> LinExprId {
        self.push_lin(Exp1::Term(v))
    }

    pub fn lin_seq(&mut self, first: D::Value, rest: LinExprId) -> LinExprId {
        self.push_lin(Exp1::Seq { first, rest })
    }

    pub fn lin_call(&mut self, callee: Symbol, arg: D::Value) -> LinExprId {
        self.push_lin(Exp1::Call { callee, arg })
    }

    pub fn lin_cond(&mut self, guard: D::Test, then_e: LinExprId, else_e: LinExprId) -> LinExprId {
        self.push_lin(Exp1::Cond {
            guard,
            then_e,
            else_e,
        })
    }

    pub fn lin_ndet(&mut self, left: LinExprId, right: LinExprId) -> LinExprId {
        self.push_lin(Exp1::Ndet { left, right })
    }

    pub fn lin_hole(&mut self, sym: Symbol) -> LinExprId {
        self.push_lin(Exp1::Hole(sym))
    }

    pub fn lin_concat(&mut self, left: LinExprId, var: Symbol, right: LinExprId) -> LinExprId {
        self.push_lin(Exp1::Concat { left, var, right })
    }

    pub fn lin_closure(&mut self, body: LinExprId, var: Symbol) -> LinExprId {
        self.push_lin(Exp1::Closure { body, var })
    }

    pub fn lin_add(&mut self, left: LinExprId, right: LinExprId) -> LinExprId {
        self.push_lin(Exp1::Add { left, right })
    }

    pub fn lin_sub(&mut self, left: LinExprId, right: LinExprId) -> LinExprId {
        self.push_lin(Exp1::Sub { left, right })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::semiring::BoolDomain;
    use crate::shared::models::SymbolTable;

    #[test]
    fn indices_are_stable() {
        let mut syms = SymbolTable::new();
        let x = syms.intern("x");
        let mut arena: ExprArena<BoolDomain> = ExprArena::new();
        let t = arena.term(true);
        let h = arena.hole(x);
        let n = arena.ndet(t, h);
        assert!(matches!(arena.node(t), Exp0::Term(true)));
        assert!(matches!(arena.node(h), Exp0::Hole(s) if *s == x));
        assert!(matches!(arena.node(n), Exp0::Ndet { .. }));
    }
}
