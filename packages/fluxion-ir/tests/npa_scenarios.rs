//! End-to-end solver scenarios over the boolean and tropical semirings,
//! plus randomized determinism and monotonicity properties.

use fluxion_ir::features::npa::{
    solve_kleene, solve_newton, EquationSystem, LinearStrategy, SolverConfig,
};
use fluxion_ir::features::semiring::{BoolDomain, Semiring, TropicalDomain};
use fluxion_ir::shared::models::{Symbol, SymbolTable};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// X = ⊤·X ⊕ ⊤ over the boolean semiring.
fn boolean_recursive() -> (EquationSystem<BoolDomain>, Symbol) {
    let mut syms = SymbolTable::new();
    let x = syms.intern("X");
    let mut system = EquationSystem::new();
    let hole = system.arena_mut().hole(x);
    let step = system.arena_mut().seq(true, hole);
    let base = system.arena_mut().term(true);
    let rhs = system.arena_mut().ndet(step, base);
    system.define(x, rhs).unwrap();
    (system, x)
}

/// X = (2 + Y) ⊓ 5, Y = (1 + X) ⊓ 10 over the tropical semiring.
fn tropical_cycle() -> (EquationSystem<TropicalDomain>, Symbol, Symbol) {
    let mut syms = SymbolTable::new();
    let x = syms.intern("X");
    let y = syms.intern("Y");
    let mut system = EquationSystem::new();

    let hy = system.arena_mut().hole(y);
    let via_y = system.arena_mut().seq(TropicalDomain::weight(2), hy);
    let base_x = system.arena_mut().term(TropicalDomain::weight(5));
    let rhs_x = system.arena_mut().ndet(via_y, base_x);
    system.define(x, rhs_x).unwrap();

    let hx = system.arena_mut().hole(x);
    let via_x = system.arena_mut().seq(TropicalDomain::weight(1), hx);
    let base_y = system.arena_mut().term(TropicalDomain::weight(10));
    let rhs_y = system.arena_mut().ndet(via_x, base_y);
    system.define(y, rhs_y).unwrap();

    (system, x, y)
}

#[test]
fn boolean_recursion_solves_to_top() {
    let dom = BoolDomain;
    let (mut system, x) = boolean_recursive();
    let newton = solve_newton(&dom, &mut system, &SolverConfig::default()).unwrap();
    assert_eq!(newton.value(x), Some(&true));
}

#[test]
fn tropical_cycle_solves_to_shortest_paths() {
    let dom = TropicalDomain;
    let (mut system, x, y) = tropical_cycle();
    let solution = solve_newton(&dom, &mut system, &SolverConfig::default()).unwrap();
    assert_eq!(solution.value(x), Some(&Some(5)));
    assert_eq!(solution.value(y), Some(&Some(6)));
}

#[test]
fn kleene_and_newton_agree_on_idempotent_domains() {
    let dom = TropicalDomain;
    let (mut system, x, y) = tropical_cycle();
    let kleene = solve_kleene(&dom, &system, &SolverConfig::default()).unwrap();
    let newton = solve_newton(&dom, &mut system, &SolverConfig::default()).unwrap();
    for sym in [x, y] {
        assert!(dom.equal(kleene.value(sym).unwrap(), newton.value(sym).unwrap()));
    }
}

#[test]
fn newton_converges_within_equation_count_plus_one() {
    let dom = TropicalDomain;
    let (mut system, _, _) = tropical_cycle();
    let solution = solve_newton(&dom, &mut system, &SolverConfig::default()).unwrap();
    assert!(solution.stats.iterations <= 3, "2 equations need at most 3 steps");
}

#[test]
fn linear_strategies_agree() {
    let dom = TropicalDomain;
    for strategy in [LinearStrategy::Naive, LinearStrategy::Worklist] {
        let (mut system, x, y) = tropical_cycle();
        let config = SolverConfig {
            linear_strategy: strategy,
            ..Default::default()
        };
        let solution = solve_newton(&dom, &mut system, &config).unwrap();
        assert_eq!(solution.value(x), Some(&Some(5)));
        assert_eq!(solution.value(y), Some(&Some(6)));
    }
}

/// Random cyclic tropical systems: X_i = (w_i + X_{succ(i)}) ⊓ c_i.
fn random_system(
    weights: &[u64],
    bases: &[u64],
    succs: &[usize],
) -> (EquationSystem<TropicalDomain>, Vec<Symbol>) {
    let mut syms = SymbolTable::new();
    let vars: Vec<Symbol> = (0..weights.len())
        .map(|i| syms.intern(&format!("X{i}")))
        .collect();
    let mut system = EquationSystem::new();
    for i in 0..weights.len() {
        let target = vars[succs[i] % vars.len()];
        let hole = system.arena_mut().hole(target);
        let step = system.arena_mut().seq(TropicalDomain::weight(weights[i]), hole);
        let base = system.arena_mut().term(TropicalDomain::weight(bases[i]));
        let rhs = system.arena_mut().ndet(step, base);
        system.define(vars[i], rhs).unwrap();
    }
    (system, vars)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two solves with identical inputs produce equal result maps.
    #[test]
    fn solves_are_deterministic(
        weights in prop::collection::vec(0u64..100, 1..6),
        bases in prop::collection::vec(0u64..100, 1..6),
        succs in prop::collection::vec(0usize..6, 1..6),
    ) {
        let n = weights.len().min(bases.len()).min(succs.len());
        let (weights, bases, succs) = (&weights[..n], &bases[..n], &succs[..n]);
        let dom = TropicalDomain;

        let (mut first, vars) = random_system(weights, bases, succs);
        let (mut second, _) = random_system(weights, bases, succs);
        let a = solve_newton(&dom, &mut first, &SolverConfig::default()).unwrap();
        let b = solve_newton(&dom, &mut second, &SolverConfig::default()).unwrap();
        for &v in &vars {
            prop_assert!(dom.equal(a.value(v).unwrap(), b.value(v).unwrap()));
        }
    }

    /// Widening an equation with an extra ndet alternative never shrinks
    /// any solved value in the join order.
    #[test]
    fn solutions_are_monotone_under_widening(
        weights in prop::collection::vec(0u64..100, 1..5),
        bases in prop::collection::vec(0u64..100, 1..5),
        succs in prop::collection::vec(0usize..5, 1..5),
        extra in 0u64..100,
    ) {
        let n = weights.len().min(bases.len()).min(succs.len());
        let (weights, bases, succs) = (&weights[..n], &bases[..n], &succs[..n]);
        let dom = TropicalDomain;

        let (mut plain, vars) = random_system(weights, bases, succs);
        let base = solve_newton(&dom, &mut plain, &SolverConfig::default()).unwrap();

        // Same system, except X0's right-hand side gains ⊕ extra.
        let mut syms = SymbolTable::new();
        let wide_vars: Vec<Symbol> = (0..n).map(|i| syms.intern(&format!("X{i}"))).collect();
        let mut widened = EquationSystem::new();
        for i in 0..n {
            let target = wide_vars[succs[i] % n];
            let hole = widened.arena_mut().hole(target);
            let step = widened.arena_mut().seq(TropicalDomain::weight(weights[i]), hole);
            let base_t = widened.arena_mut().term(TropicalDomain::weight(bases[i]));
            let mut rhs = widened.arena_mut().ndet(step, base_t);
            if i == 0 {
                let alt = widened.arena_mut().term(TropicalDomain::weight(extra));
                rhs = widened.arena_mut().ndet(rhs, alt);
            }
            widened.define(wide_vars[i], rhs).unwrap();
        }
        let wide = solve_newton(&dom, &mut widened, &SolverConfig::default()).unwrap();

        // new ⊒ old in the join order: combining absorbs the old value.
        for i in 0..n {
            let old = base.value(vars[i]).unwrap();
            let new = wide.value(wide_vars[i]).unwrap();
            prop_assert!(dom.equal(&dom.combine(new, old), new));
        }
    }
}
