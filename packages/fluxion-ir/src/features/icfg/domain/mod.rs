/*
 * ICFG Node and Edge Kinds
 *
 * The interprocedural control-flow graph is a directed multigraph: one
 * IntraBlock node per basic block, optional function entry/return marker
 * nodes, and edges that are either intraprocedural control flow or
 * call/return crossings carrying the call-site handle.
 */

use crate::shared::models::{BlockId, InstId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IcfgNodeKind {
    /// One per basic block.
    IntraBlock(BlockId),
    /// Optional marker in front of a function's entry block.
    FunEntry,
    /// Optional marker behind a function's exit blocks.
    FunReturn,
}

/// Node payload: the kind plus the index of the owning function. Intra
/// edges are only legal between nodes of the same function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcfgNode {
    pub kind: IcfgNodeKind,
    pub function: usize,
}

impl IcfgNode {
    pub fn intra(block: BlockId, function: usize) -> Self {
        Self {
            kind: IcfgNodeKind::IntraBlock(block),
            function,
        }
    }

    pub fn block(&self) -> Option<BlockId> {
        match self.kind {
            IcfgNodeKind::IntraBlock(b) => Some(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IcfgEdge {
    /// Control flow inside one function.
    IntraCf,
    /// Caller block to callee entry, carrying the call site.
    CallCf(InstId),
    /// Callee exit back to the caller block, carrying the same site.
    RetCf(InstId),
}

impl IcfgEdge {
    pub fn call_site(&self) -> Option<InstId> {
        match self {
            IcfgEdge::CallCf(site) | IcfgEdge::RetCf(site) => Some(*site),
            IcfgEdge::IntraCf => None,
        }
    }

    pub fn is_intra(&self) -> bool {
        matches!(self, IcfgEdge::IntraCf)
    }
}
