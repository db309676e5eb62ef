/*
 * Slicing Service
 *
 * Owns a built PDG and memoizes slice queries with an LRU cache, keyed
 * by seed set, direction and depth cap. Repeated queries over the same
 * graph are the common case for interactive chopping.
 */

use crate::features::pdg::infrastructure::graph::Pdg;
use crate::features::slicing::domain::{
    ChopConfig, ChopResult, SliceConfig, SliceResult, ThinSliceConfig, ThinSliceResult,
};
use crate::features::slicing::infrastructure::slicer::ProgramSlicer;
use crate::features::slicing::infrastructure::thin::ThinSlicer;
use lru::LruCache;
use petgraph::graph::NodeIndex;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SliceKey {
    seeds: Vec<usize>,
    forward: bool,
    max_depth: Option<usize>,
}

const CACHE_CAPACITY: usize = 256;

pub struct SlicingService {
    pdg: Pdg,
    cache: LruCache<SliceKey, SliceResult>,
}

impl SlicingService {
    pub fn new(pdg: Pdg) -> Self {
        Self {
            pdg,
            cache: LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero capacity")),
        }
    }

    pub fn pdg(&self) -> &Pdg {
        &self.pdg
    }

    pub fn forward(&mut self, seeds: &[NodeIndex], config: &SliceConfig) -> SliceResult {
        self.sliced(seeds, config, true)
    }

    pub fn backward(&mut self, seeds: &[NodeIndex], config: &SliceConfig) -> SliceResult {
        self.sliced(seeds, config, false)
    }

    pub fn chop(
        &mut self,
        sources: &[NodeIndex],
        targets: &[NodeIndex],
        config: &ChopConfig,
    ) -> ChopResult {
        ProgramSlicer::new(&self.pdg).chop(sources, targets, config)
    }

    pub fn thin_backward(
        &mut self,
        seeds: &[NodeIndex],
        config: &ThinSliceConfig,
    ) -> ThinSliceResult {
        ThinSlicer::new(&self.pdg).backward(seeds, config)
    }

    fn sliced(&mut self, seeds: &[NodeIndex], config: &SliceConfig, forward: bool) -> SliceResult {
        let key = SliceKey {
            seeds: seeds.iter().map(|n| n.index()).collect(),
            forward,
            max_depth: config.max_depth,
        };
        // Only filter-free or default-filter queries are keyed; a custom
        // filter bypasses the cache since functions have no identity.
        let cacheable = config.edge_filter.is_none();
        if cacheable {
            if let Some(hit) = self.cache.get(&key) {
                return hit.clone();
            }
        }
        let slicer = ProgramSlicer::new(&self.pdg);
        let result = if forward {
            slicer.forward_slice(seeds, config)
        } else {
            slicer.backward_slice(seeds, config)
        };
        if cacheable {
            self.cache.put(key, result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pdg::domain::{OperandRole, PdgEdgeKind, PdgNode, PdgNodeKey};
    use crate::shared::models::InstId;

    #[test]
    fn repeated_queries_hit_the_cache() {
        let mut pdg = Pdg::new();
        let a = PdgNodeKey::Inst(InstId(0));
        let b = PdgNodeKey::Inst(InstId(1));
        let ia = pdg.add_node(PdgNode::new(a));
        pdg.add_node(PdgNode::new(b));
        pdg.add_edge(
            a,
            b,
            PdgEdgeKind::DefUse {
                role: OperandRole::Value,
            },
        )
        .unwrap();

        let mut service = SlicingService::new(pdg);
        let first = service.forward(&[ia], &SliceConfig::default());
        let second = service.forward(&[ia], &SliceConfig::default());
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(service.cache.len(), 1);
    }
}
