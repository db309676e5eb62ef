/*
 * Interprocedural Control-Flow Graph
 *
 * petgraph-backed multigraph with a block-to-node side map. Each basic
 * block gets exactly one IntraBlock node; inserting an intra edge between
 * nodes of different functions is rejected on insertion.
 */

use crate::features::icfg::domain::{IcfgEdge, IcfgNode};
use crate::shared::models::{BlockId, FluxionError, InstId, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct Icfg {
    graph: DiGraph<IcfgNode, IcfgEdge>,
    block_map: FxHashMap<BlockId, NodeIndex>,
    /// Entry IntraBlock node per function index.
    entry_map: FxHashMap<usize, NodeIndex>,
}

impl Icfg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the IntraBlock node for a block.
    pub fn ensure_block_node(
        &mut self,
        block: BlockId,
        function: usize,
        is_entry: bool,
    ) -> NodeIndex {
        if let Some(&ix) = self.block_map.get(&block) {
            return ix;
        }
        let ix = self.graph.add_node(IcfgNode::intra(block, function));
        self.block_map.insert(block, ix);
        if is_entry {
            self.entry_map.insert(function, ix);
        }
        ix
    }

    pub fn block_node(&self, block: BlockId) -> Option<NodeIndex> {
        self.block_map.get(&block).copied()
    }

    pub fn function_entry(&self, function: usize) -> Option<NodeIndex> {
        self.entry_map.get(&function).copied()
    }

    pub fn node(&self, ix: NodeIndex) -> &IcfgNode {
        &self.graph[ix]
    }

    /// Intra edge; both endpoints must belong to the same function.
    pub fn add_intra_edge(&mut self, src: NodeIndex, dst: NodeIndex) -> Result<()> {
        let (sf, df) = (self.graph[src].function, self.graph[dst].function);
        if sf != df {
            return Err(FluxionError::malformed_ir(
                "intra edge crosses functions",
                format!("{:?} -> {:?}", self.graph[src].kind, self.graph[dst].kind),
            ));
        }
        self.graph.add_edge(src, dst, IcfgEdge::IntraCf);
        Ok(())
    }

    pub fn add_call_edge(&mut self, src: NodeIndex, dst: NodeIndex, site: InstId) {
        self.graph.add_edge(src, dst, IcfgEdge::CallCf(site));
    }

    pub fn add_ret_edge(&mut self, src: NodeIndex, dst: NodeIndex, site: InstId) {
        self.graph.add_edge(src, dst, IcfgEdge::RetCf(site));
    }

    pub fn successors(&self, ix: NodeIndex) -> impl Iterator<Item = (NodeIndex, &IcfgEdge)> {
        self.graph
            .edges_directed(ix, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    pub fn predecessors(&self, ix: NodeIndex) -> impl Iterator<Item = (NodeIndex, &IcfgEdge)> {
        self.graph
            .edges_directed(ix, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges as (source, target, kind) triples.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &IcfgEdge)> {
        self.graph
            .edge_indices()
            .map(|e| {
                let (s, t) = self.graph.edge_endpoints(e).expect("edge exists");
                (s, t, &self.graph[e])
            })
    }
}
