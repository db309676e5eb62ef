//! ICFG construction and the two-phase interprocedural engine.

mod common;

use common::*;
use fluxion_ir::features::icfg::{build_icfg, IcfgEdge};
use fluxion_ir::features::interprocedural::{EngineConfig, ReachingDefs};
use fluxion_ir::shared::models::{BlockId, CallString, InstId};
use pretty_assertions::assert_eq;

/// main has two blocks and calls g from the second; g is single-block.
fn caller_callee() -> fluxion_ir::shared::models::ModuleIndex {
    module(
        "m",
        vec![
            func(
                "main",
                &[],
                vec![
                    block(0, vec![konst(0, 1, 7), branch(1)], &[1]),
                    block(1, vec![call(2, "g", &[1], Some(2)), ret(3, Some(2))], &[]),
                ],
            ),
            func(
                "g",
                &[10],
                vec![block(2, vec![assign(4, 11, &[10]), ret(5, Some(11))], &[])],
            ),
        ],
    )
    .finalize()
    .unwrap()
}

#[test]
fn icfg_has_one_node_per_block_and_matching_call_ret_edges() {
    let module = caller_callee();
    let icfg = build_icfg(&module).unwrap();

    // Three blocks, three IntraBlock nodes.
    assert_eq!(icfg.node_count(), 3);

    let intra: Vec<_> = icfg
        .edges()
        .filter(|(_, _, e)| matches!(e, IcfgEdge::IntraCf))
        .collect();
    assert_eq!(intra.len(), 1, "main's bb0 -> bb1");

    let calls: Vec<_> = icfg
        .edges()
        .filter(|(_, _, e)| matches!(e, IcfgEdge::CallCf(_)))
        .collect();
    let rets: Vec<_> = icfg
        .edges()
        .filter(|(_, _, e)| matches!(e, IcfgEdge::RetCf(_)))
        .collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(rets.len(), 1);

    let (call_src, call_dst, call_edge) = calls[0];
    let (ret_src, ret_dst, ret_edge) = rets[0];
    assert_eq!(call_edge.call_site(), Some(InstId(2)));
    assert_eq!(ret_edge.call_site(), Some(InstId(2)));
    // Call goes from main's calling block into g's entry; the return edge
    // comes back from g's exit to the same caller block.
    assert_eq!(icfg.node(call_src).block(), Some(BlockId(1)));
    assert_eq!(icfg.node(call_dst).block(), Some(BlockId(2)));
    assert_eq!(ret_src, call_dst);
    assert_eq!(ret_dst, call_src);
}

#[test]
fn reaching_defs_flow_through_branches_and_calls() {
    // main: bb0 defines %1 and conditionally branches to bb1 or bb2, both
    // joining in bb3.
    let index = module(
        "m",
        vec![func(
            "main",
            &[],
            vec![
                block(0, vec![konst(0, 1, 0), cond_branch(1, 1)], &[1, 2]),
                block(1, vec![konst(2, 2, 1), branch(3)], &[3]),
                block(2, vec![konst(4, 3, 2), branch(5)], &[3]),
                block(3, vec![ret(6, None)], &[]),
            ],
        )],
    )
    .finalize()
    .unwrap();

    let result = ReachingDefs::run(&index, EngineConfig::default()).unwrap();
    let root = CallString::root();

    let join = result.block_fact(BlockId(3), &root).unwrap();
    // %1 reaches the join on every path; %2 and %3 on one path each.
    assert!(join.contains(0));
    assert!(join.contains(1));
    assert!(join.contains(2));

    let left = result.block_fact(BlockId(1), &root).unwrap();
    assert!(left.contains(0));
    assert!(!left.contains(2));
}

#[test]
fn contexts_are_bounded_by_k() {
    // Self-recursive function: contexts must not explode past K.
    let index = module(
        "m",
        vec![func(
            "main",
            &[],
            vec![block(
                0,
                vec![call(0, "main", &[], None), ret(1, None)],
                &[],
            )],
        )],
    )
    .finalize()
    .unwrap();

    let config = EngineConfig {
        k_cfa_depth: 1,
        ..Default::default()
    };
    let result = ReachingDefs::run(&index, config).unwrap();
    // Root context and one recursive context: the push is idempotent at
    // depth 1 because the site sequence is already [i0].
    assert_eq!(result.function_symbols.len(), 2);
    assert!(!result.flags.is_partial());
}

#[test]
fn context_does_not_change_uninfluenced_summaries() {
    // No main: f and g both seed at the root, and f also calls g, so g
    // gets solved under two contexts. g calls nothing, so its summary
    // cannot depend on who called it.
    let index = module(
        "m",
        vec![
            func(
                "f",
                &[],
                vec![block(0, vec![call(0, "g", &[], None), ret(1, None)], &[])],
            ),
            func(
                "g",
                &[],
                vec![block(1, vec![konst(2, 1, 3), ret(3, Some(1))], &[])],
            ),
        ],
    )
    .finalize()
    .unwrap();

    let result = ReachingDefs::run(&index, EngineConfig::default()).unwrap();
    let root = CallString::root();
    let called = root.push(InstId(0), 1);
    let at_root = result.function_summary(1, &root).unwrap();
    let at_call = result.function_summary(1, &called).unwrap();
    assert_eq!(at_root, at_call);
}

#[test]
fn summaries_exist_per_context() {
    let index = caller_callee();
    let result = ReachingDefs::run(&index, EngineConfig::default()).unwrap();

    let root = CallString::root();
    let g_context = root.push(InstId(2), 1);
    // main runs in the root context, g under the call-site context.
    assert!(result.function_summary(0, &root).is_some());
    assert!(result.function_summary(1, &g_context).is_some());
    // g was never reached in the root context.
    assert!(result.function_summary(1, &root).is_none());

    // g's entry sees main's definition of %1 and the call-entry state.
    let g_entry = result.block_fact(BlockId(2), &g_context).unwrap();
    assert!(g_entry.contains(0), "def of %1 reaches g");
}
