/*
 * ICFG Graph Queries
 *
 * Structural helpers used by clients that order or prune their work over
 * the control-flow graph: intra-procedural back-edge detection, BFS
 * distance maps, shortest block paths and plain reachability.
 */

use crate::features::icfg::infrastructure::graph::Icfg;
use crate::shared::models::BlockId;
use petgraph::graph::NodeIndex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Intra back edges of one function as (tail, header) block pairs.
pub fn find_intra_backedges(icfg: &Icfg, entry: BlockId) -> Vec<(BlockId, BlockId)> {
    let Some(start) = icfg.block_node(entry) else {
        return Vec::new();
    };
    let mut backedges = Vec::new();
    let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();
    let mut on_stack: FxHashSet<NodeIndex> = FxHashSet::default();
    dfs(icfg, start, &mut visited, &mut on_stack, &mut backedges);
    backedges
}

fn dfs(
    icfg: &Icfg,
    node: NodeIndex,
    visited: &mut FxHashSet<NodeIndex>,
    on_stack: &mut FxHashSet<NodeIndex>,
    backedges: &mut Vec<(BlockId, BlockId)>,
) {
    visited.insert(node);
    on_stack.insert(node);
    let succs: Vec<NodeIndex> = icfg
        .successors(node)
        .filter(|(_, e)| e.is_intra())
        .map(|(n, _)| n)
        .collect();
    for succ in succs {
        if on_stack.contains(&succ) {
            if let (Some(tail), Some(header)) = (icfg.node(node).block(), icfg.node(succ).block())
            {
                backedges.push((tail, header));
            }
        } else if !visited.contains(&succ) {
            dfs(icfg, succ, visited, on_stack, backedges);
        }
    }
    on_stack.remove(&node);
}

/// BFS hop distances from `source` along every edge kind.
pub fn distance_map(icfg: &Icfg, source: NodeIndex) -> FxHashMap<NodeIndex, u64> {
    let mut distances = FxHashMap::default();
    distances.insert(source, 0u64);
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        let d = distances[&node];
        let succs: Vec<NodeIndex> = icfg.successors(node).map(|(n, _)| n).collect();
        for succ in succs {
            if !distances.contains_key(&succ) {
                distances.insert(succ, d + 1);
                queue.push_back(succ);
            }
        }
    }
    distances
}

/// Shortest intra-procedural block path from `from` to `to`, inclusive.
pub fn shortest_path_intra(icfg: &Icfg, from: BlockId, to: BlockId) -> Option<Vec<BlockId>> {
    let start = icfg.block_node(from)?;
    let goal = icfg.block_node(to)?;
    let mut parents: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
    let mut visited: FxHashSet<NodeIndex> = FxHashSet::from_iter([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        if node == goal {
            let mut path = vec![icfg.node(node).block()?];
            let mut cursor = node;
            while let Some(&parent) = parents.get(&cursor) {
                path.push(icfg.node(parent).block()?);
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }
        let succs: Vec<NodeIndex> = icfg
            .successors(node)
            .filter(|(_, e)| e.is_intra())
            .map(|(n, _)| n)
            .collect();
        for succ in succs {
            if visited.insert(succ) {
                parents.insert(succ, node);
                queue.push_back(succ);
            }
        }
    }
    None
}

/// Whether `to` is reachable from `from` along any edge kind.
pub fn is_reachable(icfg: &Icfg, from: NodeIndex, to: NodeIndex) -> bool {
    distance_map(icfg, from).contains_key(&to)
}
