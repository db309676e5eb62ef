/*
 * Dependency Extraction
 *
 * Collects the variable symbols a linear expression mentions: holes, call
 * targets, and the binders of concat/closure nodes. The worklist linear
 * solver uses this to re-enqueue exactly the equations affected by an
 * update; call targets count as dependencies because a delta variable can
 * flow in through either a hole or a call.
 */

use crate::features::expression::domain::{Exp1, LinExprId};
use crate::features::expression::infrastructure::arena::ExprArena;
use crate::features::semiring::Semiring;
use crate::shared::models::Symbol;
use rustc_hash::FxHashSet;

/// Symbols the linear expression `root` depends on.
pub fn linear_deps<D: Semiring>(arena: &ExprArena<D>, root: LinExprId) -> FxHashSet<Symbol> {
    let mut deps = FxHashSet::default();
    collect(arena, root, &mut deps);
    deps
}

fn collect<D: Semiring>(arena: &ExprArena<D>, id: LinExprId, deps: &mut FxHashSet<Symbol>) {
    match arena.lin_node(id) {
        Exp1::Term(_) => {}
        Exp1::Hole(sym) => {
            deps.insert(*sym);
        }
        Exp1::Call { callee, .. } => {
            deps.insert(*callee);
        }
        Exp1::Seq { rest, .. } => collect(arena, *rest, deps),
        Exp1::Cond { then_e, else_e, .. } => {
            collect(arena, *then_e, deps);
            collect(arena, *else_e, deps);
        }
        Exp1::Ndet { left, right }
        | Exp1::Add { left, right }
        | Exp1::Sub { left, right } => {
            collect(arena, *left, deps);
            collect(arena, *right, deps);
        }
        Exp1::Concat { left, var, right } => {
            deps.insert(*var);
            collect(arena, *left, deps);
            collect(arena, *right, deps);
        }
        Exp1::Closure { body, var } => {
            deps.insert(*var);
            collect(arena, *body, deps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::semiring::BoolDomain;
    use crate::shared::models::SymbolTable;

    #[test]
    fn collects_holes_and_calls() {
        let mut syms = SymbolTable::new();
        let x = syms.intern("x");
        let f = syms.intern("f");
        let mut arena: ExprArena<BoolDomain> = ExprArena::new();
        let h = arena.lin_hole(x);
        let c = arena.lin_call(f, true);
        let add = arena.lin_add(h, c);
        let deps = linear_deps(&arena, add);
        assert!(deps.contains(&x));
        assert!(deps.contains(&f));
        assert_eq!(deps.len(), 2);
    }
}
