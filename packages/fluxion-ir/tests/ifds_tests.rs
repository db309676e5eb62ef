//! IFDS tabulation: zero-fact reachability, summary caching, budgets and
//! cancellation, and the IDE constant-propagation layer.

mod common;

use common::*;
use fluxion_ir::features::ifds::{
    solve_ide, ConstFact, ConstValue, ConstantPropagation, FlowFact, IfdsConfig, IfdsProblem,
    IfdsSolver, SupergraphSkeleton,
};
use fluxion_ir::shared::models::{
    CancelToken, Function, Inst, InstId, ModuleIndex, StepBudget, ValueId,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::collections::HashMap;

/// The zero-only fact domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ZeroFact;

impl FlowFact for ZeroFact {
    fn zero() -> Self {
        ZeroFact
    }
    fn is_zero(&self) -> bool {
        true
    }
}

/// Identity client: every flow function passes the fact through, and
/// call flow enters every callee. Counts per-statement evaluations so
/// tests can observe summary-cache hits.
struct IdentityProblem<'a> {
    module: &'a ModuleIndex,
    evals: RefCell<HashMap<InstId, u32>>,
}

impl<'a> IdentityProblem<'a> {
    fn new(module: &'a ModuleIndex) -> Self {
        Self {
            module,
            evals: RefCell::new(HashMap::new()),
        }
    }

    fn count(&self, stmt: InstId) {
        *self.evals.borrow_mut().entry(stmt).or_insert(0) += 1;
    }
}

impl IfdsProblem for IdentityProblem<'_> {
    type Fact = ZeroFact;

    fn initial_facts(&self) -> Vec<(InstId, ZeroFact)> {
        let main = self.module.function("main").expect("main exists");
        vec![(main.entry_block().unwrap().insts[0].id, ZeroFact)]
    }

    fn normal_flow(&self, stmt: &Inst, fact: &ZeroFact) -> Vec<ZeroFact> {
        self.count(stmt.id);
        vec![fact.clone()]
    }

    fn call_flow(&self, call: &Inst, _callee: &Function, fact: &ZeroFact) -> Vec<ZeroFact> {
        self.count(call.id);
        vec![fact.clone()]
    }

    fn return_flow(
        &self,
        _call: &Inst,
        _callee: &Function,
        exit_fact: &ZeroFact,
        _call_fact: &ZeroFact,
    ) -> Vec<ZeroFact> {
        vec![exit_fact.clone()]
    }

    fn call_to_return_flow(&self, _call: &Inst, fact: &ZeroFact) -> Vec<ZeroFact> {
        vec![fact.clone()]
    }
}

/// main calls g twice; g is a two-instruction function.
fn double_call_module() -> ModuleIndex {
    module(
        "m",
        vec![
            func(
                "main",
                &[],
                vec![block(
                    0,
                    vec![
                        call(0, "g", &[], None),
                        call(1, "g", &[], None),
                        ret(2, None),
                    ],
                    &[],
                )],
            ),
            func(
                "g",
                &[],
                vec![block(1, vec![konst(3, 1, 9), ret(4, Some(1))], &[])],
            ),
        ],
    )
    .finalize()
    .unwrap()
}

#[test]
fn zero_fact_reaches_every_statement() {
    let index = double_call_module();
    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = IdentityProblem::new(&index);
    let result = IfdsSolver::new(&problem, &index, &graph, IfdsConfig::default())
        .solve()
        .unwrap();

    for inst in index.insts() {
        assert!(
            result.is_reached(inst.id, &ZeroFact),
            "{} must be reached",
            inst.id
        );
    }
}

#[test]
fn second_visit_of_same_entry_fact_is_a_cache_hit() {
    let index = double_call_module();
    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = IdentityProblem::new(&index);
    let result = IfdsSolver::new(&problem, &index, &graph, IfdsConfig::default())
        .solve()
        .unwrap();
    assert!(!result.flags.is_partial());

    // g's body (konst at i3) is evaluated once even though g is called
    // twice with the same entry fact: the second call replays the cached
    // summary without re-exploring the callee.
    let evals = problem.evals.borrow();
    assert_eq!(evals.get(&InstId(3)).copied().unwrap_or(0), 1);
}

#[test]
fn step_budget_yields_incomplete_result() {
    let index = double_call_module();
    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = IdentityProblem::new(&index);
    let config = IfdsConfig {
        step_budget: StepBudget::steps(1),
        ..Default::default()
    };
    let result = IfdsSolver::new(&problem, &index, &graph, config)
        .solve()
        .unwrap();
    assert!(result.flags.incomplete);
    assert!(!result.flags.cancelled);
}

#[test]
fn cancellation_yields_cancelled_result() {
    let index = double_call_module();
    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = IdentityProblem::new(&index);
    let token = CancelToken::new();
    token.cancel();
    let config = IfdsConfig {
        cancellation_token: Some(token),
        ..Default::default()
    };
    let result = IfdsSolver::new(&problem, &index, &graph, config)
        .solve()
        .unwrap();
    assert!(result.flags.cancelled);
}

#[test]
fn ide_propagates_constants_through_calls() {
    // id(x) { return x; }  main { %1 = const 42; %2 = id(%1); ret }
    let index = module(
        "m",
        vec![
            func(
                "main",
                &[],
                vec![block(
                    0,
                    vec![
                        konst(0, 1, 42),
                        call(1, "id", &[1], Some(2)),
                        ret(2, Some(2)),
                    ],
                    &[],
                )],
            ),
            func("id", &[10], vec![block(1, vec![ret(3, Some(10))], &[])]),
        ],
    )
    .finalize()
    .unwrap();

    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = ConstantPropagation::new(&index, "main").unwrap();
    let result = solve_ide(&problem, &index, &graph, IfdsConfig::default()).unwrap();

    // At the return in main, %2 carries the constant 42.
    let value = result
        .values
        .get(&(InstId(2), ConstFact::Var(ValueId(2))))
        .copied();
    assert_eq!(value, Some(ConstValue::Const(42)));
}

#[test]
fn ide_copy_preserves_the_constant() {
    // %1 = const 5; %2 = %1; ret %2
    let index = module(
        "m",
        vec![func(
            "main",
            &[],
            vec![block(
                0,
                vec![konst(0, 1, 5), assign(1, 2, &[1]), ret(2, Some(2))],
                &[],
            )],
        )],
    )
    .finalize()
    .unwrap();

    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = ConstantPropagation::new(&index, "main").unwrap();
    let result = solve_ide(&problem, &index, &graph, IfdsConfig::default()).unwrap();

    let at_ret = result
        .values
        .get(&(InstId(2), ConstFact::Var(ValueId(2))))
        .copied();
    assert_eq!(at_ret, Some(ConstValue::Const(5)));
}

#[test]
fn ide_keeps_constant_when_merged_paths_agree() {
    // Both branches bind the same literal; the phi stays precise.
    let index = module(
        "m",
        vec![func(
            "main",
            &[],
            vec![
                block(0, vec![konst(0, 9, 0), cond_branch(1, 9)], &[1, 2]),
                block(1, vec![konst(2, 1, 5), branch(3)], &[3]),
                block(2, vec![konst(4, 2, 5), branch(5)], &[3]),
                block(
                    3,
                    vec![
                        inst(
                            6,
                            fluxion_ir::shared::models::InstKind::Phi {
                                result: ValueId(3),
                                operands: vec![ValueId(1), ValueId(2)],
                            },
                        ),
                        ret(7, Some(3)),
                    ],
                    &[],
                ),
            ],
        )],
    )
    .finalize()
    .unwrap();

    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = ConstantPropagation::new(&index, "main").unwrap();
    let result = solve_ide(&problem, &index, &graph, IfdsConfig::default()).unwrap();

    let at_ret = result
        .values
        .get(&(InstId(7), ConstFact::Var(ValueId(3))))
        .copied();
    assert_eq!(at_ret, Some(ConstValue::Const(5)));
}

#[test]
fn ide_joins_disagreeing_constants_to_bottom() {
    // %1 = const 1 or %2 = const 2 on two branches; %3 = phi(%1, %2).
    let index = module(
        "m",
        vec![func(
            "main",
            &[],
            vec![
                block(0, vec![konst(0, 9, 0), cond_branch(1, 9)], &[1, 2]),
                block(1, vec![konst(2, 1, 1), branch(3)], &[3]),
                block(2, vec![konst(4, 2, 2), branch(5)], &[3]),
                block(
                    3,
                    vec![
                        inst(
                            6,
                            fluxion_ir::shared::models::InstKind::Phi {
                                result: ValueId(3),
                                operands: vec![ValueId(1), ValueId(2)],
                            },
                        ),
                        ret(7, Some(3)),
                    ],
                    &[],
                ),
            ],
        )],
    )
    .finalize()
    .unwrap();

    let graph = SupergraphSkeleton::build(&index).unwrap();
    let problem = ConstantPropagation::new(&index, "main").unwrap();
    let result = solve_ide(&problem, &index, &graph, IfdsConfig::default()).unwrap();

    // Each branch constant is precise at the phi; their merge is not.
    let at_ret = result
        .values
        .get(&(InstId(7), ConstFact::Var(ValueId(3))))
        .copied();
    assert_eq!(at_ret, Some(ConstValue::Bottom));
}
