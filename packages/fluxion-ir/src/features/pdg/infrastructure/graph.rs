/*
 * Program Dependence Graph
 *
 * petgraph-backed multigraph with a key-to-index side map. An explicit
 * value owned by whoever built it; rebuilding for a different module
 * means building a new graph. Edges to unknown keys are fatal at build
 * time; traversals never mutate the graph.
 */

use crate::features::pdg::domain::{PdgEdgeKind, PdgNode, PdgNodeKey};
use crate::shared::models::{FluxionError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct Pdg {
    graph: DiGraph<PdgNode, PdgEdgeKind>,
    key_map: FxHashMap<PdgNodeKey, NodeIndex>,
}

impl Pdg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: PdgNode) -> NodeIndex {
        if let Some(&ix) = self.key_map.get(&node.key) {
            return ix;
        }
        let key = node.key;
        let ix = self.graph.add_node(node);
        self.key_map.insert(key, ix);
        ix
    }

    pub fn node_index(&self, key: PdgNodeKey) -> Option<NodeIndex> {
        self.key_map.get(&key).copied()
    }

    pub fn node(&self, ix: NodeIndex) -> &PdgNode {
        &self.graph[ix]
    }

    /// Insert an edge between two existing nodes, by key.
    pub fn add_edge(&mut self, from: PdgNodeKey, to: PdgNodeKey, kind: PdgEdgeKind) -> Result<()> {
        let src = self
            .node_index(from)
            .ok_or_else(|| FluxionError::malformed_ir("dangling edge source", format!("{from:?}")))?;
        let dst = self
            .node_index(to)
            .ok_or_else(|| FluxionError::malformed_ir("dangling edge target", format!("{to:?}")))?;
        self.graph.add_edge(src, dst, kind);
        Ok(())
    }

    pub fn out_edges(&self, ix: NodeIndex) -> impl Iterator<Item = (NodeIndex, PdgEdgeKind)> + '_ {
        self.graph
            .edges_directed(ix, Direction::Outgoing)
            .map(|e| (e.target(), *e.weight()))
    }

    pub fn in_edges(&self, ix: NodeIndex) -> impl Iterator<Item = (NodeIndex, PdgEdgeKind)> + '_ {
        self.graph
            .edges_directed(ix, Direction::Incoming)
            .map(|e| (e.source(), *e.weight()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &PdgNode)> {
        self.graph
            .node_indices()
            .map(move |ix| (ix, &self.graph[ix]))
    }
}
