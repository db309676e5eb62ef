/*
 * Forward/Backward Slicing and Chopping
 *
 * BFS along out-edges (forward) or in-edges (backward) restricted to an
 * allowed edge-kind set, with an optional depth cap. A chop with no path
 * caps is exactly forward(S) ∩ backward(T); with caps a DFS enumerates
 * simple paths and the diagnostics record which caps were hit.
 */

use crate::features::pdg::infrastructure::graph::Pdg;
use crate::features::slicing::domain::{
    ChopConfig, ChopDiagnostics, ChopResult, SliceConfig, SliceDiagnostics, SliceResult,
};
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Forward,
    Backward,
}

pub struct ProgramSlicer<'a> {
    pdg: &'a Pdg,
}

impl<'a> ProgramSlicer<'a> {
    pub fn new(pdg: &'a Pdg) -> Self {
        Self { pdg }
    }

    /// Nodes that may be affected by any seed, along allowed out-edges.
    pub fn forward_slice(&self, seeds: &[NodeIndex], config: &SliceConfig) -> SliceResult {
        self.traverse(seeds, config, Dir::Forward)
    }

    /// Nodes that can affect any seed, along allowed in-edges.
    pub fn backward_slice(&self, seeds: &[NodeIndex], config: &SliceConfig) -> SliceResult {
        self.traverse(seeds, config, Dir::Backward)
    }

    /// Nodes on dependence paths from `sources` to `targets`.
    pub fn chop(
        &self,
        sources: &[NodeIndex],
        targets: &[NodeIndex],
        config: &ChopConfig,
    ) -> ChopResult {
        if !config.wants_paths() {
            let forward = self.forward_slice(sources, &config.slice);
            let backward = self.backward_slice(targets, &config.slice);
            let nodes: FxHashSet<NodeIndex> = forward
                .nodes
                .intersection(&backward.nodes)
                .copied()
                .collect();
            let diagnostics = ChopDiagnostics {
                chop_size: nodes.len(),
                max_depth_hit: forward.diagnostics.depth_cap_hit
                    || backward.diagnostics.depth_cap_hit,
                ..Default::default()
            };
            return ChopResult {
                nodes,
                paths: None,
                diagnostics,
            };
        }
        self.enumerate_paths(sources, targets, config)
    }

    fn traverse(&self, seeds: &[NodeIndex], config: &SliceConfig, dir: Dir) -> SliceResult {
        let mut visited: FxHashSet<NodeIndex> = seeds.iter().copied().collect();
        let mut queue: VecDeque<(NodeIndex, usize)> =
            seeds.iter().map(|&n| (n, 0usize)).collect();
        let mut diagnostics = SliceDiagnostics::default();

        while let Some((node, depth)) = queue.pop_front() {
            diagnostics.max_depth_reached = diagnostics.max_depth_reached.max(depth);
            let neighbors: Vec<NodeIndex> = match dir {
                Dir::Forward => self
                    .pdg
                    .out_edges(node)
                    .filter(|(_, k)| config.edge_filter.map_or(true, |f| f(k)))
                    .map(|(n, _)| n)
                    .collect(),
                Dir::Backward => self
                    .pdg
                    .in_edges(node)
                    .filter(|(_, k)| config.edge_filter.map_or(true, |f| f(k)))
                    .map(|(n, _)| n)
                    .collect(),
            };
            if let Some(cap) = config.max_depth {
                if depth >= cap {
                    if neighbors.iter().any(|n| !visited.contains(n)) {
                        diagnostics.depth_cap_hit = true;
                    }
                    continue;
                }
            }
            for next in neighbors {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        diagnostics.slice_size = visited.len();
        debug!(size = visited.len(), ?dir, "slice complete");
        SliceResult {
            nodes: visited,
            diagnostics,
        }
    }

    /// DFS over simple paths from sources to targets under the caps.
    fn enumerate_paths(
        &self,
        sources: &[NodeIndex],
        targets: &[NodeIndex],
        config: &ChopConfig,
    ) -> ChopResult {
        let target_set: FxHashSet<NodeIndex> = targets.iter().copied().collect();
        let mut diagnostics = ChopDiagnostics::default();
        let mut paths: Vec<Vec<NodeIndex>> = Vec::new();

        for &source in sources {
            let mut stack = vec![source];
            let mut on_path: FxHashSet<NodeIndex> = FxHashSet::from_iter([source]);
            self.dfs_paths(
                &target_set,
                config,
                &mut stack,
                &mut on_path,
                &mut paths,
                &mut diagnostics,
            );
            if diagnostics.max_paths_hit {
                break;
            }
        }

        let nodes: FxHashSet<NodeIndex> = paths.iter().flatten().copied().collect();
        diagnostics.chop_size = nodes.len();
        diagnostics.paths_enumerated = paths.len();
        ChopResult {
            nodes,
            paths: Some(paths),
            diagnostics,
        }
    }

    fn dfs_paths(
        &self,
        targets: &FxHashSet<NodeIndex>,
        config: &ChopConfig,
        stack: &mut Vec<NodeIndex>,
        on_path: &mut FxHashSet<NodeIndex>,
        paths: &mut Vec<Vec<NodeIndex>>,
        diagnostics: &mut ChopDiagnostics,
    ) {
        let current = *stack.last().expect("path stack never empty");
        if targets.contains(&current) {
            paths.push(stack.clone());
            if let Some(cap) = config.max_paths {
                if paths.len() >= cap {
                    diagnostics.max_paths_hit = true;
                }
            }
            return;
        }
        if let Some(cap) = config.max_path_length {
            if stack.len() >= cap {
                diagnostics.max_path_length_hit = true;
                return;
            }
        }
        if let Some(cap) = config.slice.max_depth {
            if stack.len() > cap {
                diagnostics.max_depth_hit = true;
                return;
            }
        }
        let neighbors: Vec<NodeIndex> = self
            .pdg
            .out_edges(current)
            .filter(|(_, k)| config.slice.edge_filter.map_or(true, |f| f(k)))
            .map(|(n, _)| n)
            .collect();
        for next in neighbors {
            if diagnostics.max_paths_hit {
                return;
            }
            if !on_path.insert(next) {
                continue;
            }
            stack.push(next);
            self.dfs_paths(targets, config, stack, on_path, paths, diagnostics);
            stack.pop();
            on_path.remove(&next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pdg::domain::{OperandRole, PdgEdgeKind, PdgNode, PdgNodeKey};
    use crate::shared::models::InstId;

    fn value_edge() -> PdgEdgeKind {
        PdgEdgeKind::DefUse {
            role: OperandRole::Value,
        }
    }

    /// 0 → 1 → 2 and 0 → 3 (3 off any 0→2 path).
    fn diamondish() -> (Pdg, Vec<NodeIndex>) {
        let mut pdg = Pdg::new();
        let keys: Vec<PdgNodeKey> = (0..4).map(|i| PdgNodeKey::Inst(InstId(i))).collect();
        let ixs: Vec<NodeIndex> = keys
            .iter()
            .map(|&k| pdg.add_node(PdgNode::new(k)))
            .collect();
        pdg.add_edge(keys[0], keys[1], value_edge()).unwrap();
        pdg.add_edge(keys[1], keys[2], value_edge()).unwrap();
        pdg.add_edge(keys[0], keys[3], value_edge()).unwrap();
        (pdg, ixs)
    }

    #[test]
    fn chop_equals_intersection_without_caps() {
        let (pdg, ixs) = diamondish();
        let slicer = ProgramSlicer::new(&pdg);
        let config = ChopConfig::default();
        let chop = slicer.chop(&[ixs[0]], &[ixs[2]], &config);

        let forward = slicer.forward_slice(&[ixs[0]], &config.slice);
        let backward = slicer.backward_slice(&[ixs[2]], &config.slice);
        let expected: FxHashSet<NodeIndex> = forward
            .nodes
            .intersection(&backward.nodes)
            .copied()
            .collect();
        assert_eq!(chop.nodes, expected);
        assert!(!chop.nodes.contains(&ixs[3]));
        assert!(chop.paths.is_none());
    }

    #[test]
    fn path_enumeration_reports_caps() {
        let (pdg, ixs) = diamondish();
        let slicer = ProgramSlicer::new(&pdg);
        let config = ChopConfig {
            max_paths: Some(1),
            ..Default::default()
        };
        let chop = slicer.chop(&[ixs[0]], &[ixs[2]], &config);
        let paths = chop.paths.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], vec![ixs[0], ixs[1], ixs[2]]);
    }

    #[test]
    fn depth_cap_truncates_and_flags() {
        let (pdg, ixs) = diamondish();
        let slicer = ProgramSlicer::new(&pdg);
        let config = SliceConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        let slice = slicer.forward_slice(&[ixs[0]], &config);
        assert!(slice.nodes.contains(&ixs[1]));
        assert!(!slice.nodes.contains(&ixs[2]));
        assert!(slice.diagnostics.depth_cap_hit);
    }
}
