/*
 * Slicing Configuration, Diagnostics and Results
 *
 * Traversals return owned node sets plus a diagnostics record stating
 * which caps, if any, were hit. Caps produce best-effort results, never
 * errors.
 */

use crate::features::pdg::domain::PdgEdgeKind;
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Which edge kinds a traversal may follow. `None` means all.
pub type EdgeFilter = Option<fn(&PdgEdgeKind) -> bool>;

#[derive(Debug, Clone, Default)]
pub struct SliceConfig {
    /// Allowed edge kinds; `None` follows every edge.
    pub edge_filter: EdgeFilter,
    /// Traversal depth cap; `None` is unlimited.
    pub max_depth: Option<usize>,
}

impl SliceConfig {
    /// Default slicing filter: data plus parameter-passing edges.
    pub fn data_and_params() -> Self {
        Self {
            edge_filter: Some(|k| k.is_data() || k.is_param()),
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChopConfig {
    pub slice: SliceConfig,
    /// Enumerate simple paths when any of these caps is set.
    pub max_paths: Option<usize>,
    pub max_path_length: Option<usize>,
}

impl ChopConfig {
    pub fn wants_paths(&self) -> bool {
        self.max_paths.is_some() || self.max_path_length.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThinSliceConfig {
    /// Match call/return crossings as a Dyck language.
    pub context_sensitive: bool,
    /// Call-string cap during Dyck matching; `None` is unlimited.
    pub max_stack_depth: Option<usize>,
    /// Safety cap on explored (node, stack) states.
    pub max_states: Option<usize>,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceDiagnostics {
    pub slice_size: usize,
    pub max_depth_reached: usize,
    pub depth_cap_hit: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChopDiagnostics {
    pub chop_size: usize,
    pub paths_enumerated: usize,
    pub max_paths_hit: bool,
    pub max_path_length_hit: bool,
    pub max_depth_hit: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinSliceDiagnostics {
    pub slice_size: usize,
    pub base_ptr_deps_excluded: usize,
    pub control_deps_excluded: usize,
    pub max_stack_depth_reached: usize,
    pub state_limit_hit: bool,
    pub stack_depth_limit_hit: bool,
}

#[derive(Debug, Clone)]
pub struct SliceResult {
    pub nodes: FxHashSet<NodeIndex>,
    pub diagnostics: SliceDiagnostics,
}

#[derive(Debug, Clone)]
pub struct ChopResult {
    pub nodes: FxHashSet<NodeIndex>,
    /// Simple paths, present only when path enumeration was requested.
    pub paths: Option<Vec<Vec<NodeIndex>>>,
    pub diagnostics: ChopDiagnostics,
}

#[derive(Debug, Clone)]
pub struct ThinSliceResult {
    pub nodes: FxHashSet<NodeIndex>,
    pub diagnostics: ThinSliceDiagnostics,
}
