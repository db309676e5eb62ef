/*
 * Engine Configuration and Results
 *
 * Summaries are keyed by interned (function, context) symbols, block
 * entry facts by (block, context) symbols. The result keeps the key maps
 * and the symbol table so callers can resolve either direction.
 */

use crate::features::npa::{LinearStrategy, SolverStats};
use crate::shared::models::{BlockId, CallString, SolveFlags, Symbol, SymbolTable};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Call-string length bound K; 0 is context-insensitive.
    pub k_cfa_depth: usize,
    pub linear_strategy: LinearStrategy,
    /// Cap on Newton outer iterations; `None` solves to fixpoint.
    pub max_newton_iter: Option<u32>,
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k_cfa_depth: 1,
            linear_strategy: LinearStrategy::Worklist,
            max_newton_iter: None,
            verbose: false,
        }
    }
}

/// Output of the two-phase engine run.
#[derive(Debug)]
pub struct EngineResult<V, F> {
    /// Phase 1: solved summary per (function, context) and (block, context)
    /// symbol.
    pub summaries: FxHashMap<Symbol, V>,
    /// Phase 2: fact at each (block, context) entry.
    pub block_entry_facts: FxHashMap<Symbol, F>,
    /// Key maps for resolving symbols.
    pub block_symbols: FxHashMap<(BlockId, CallString), Symbol>,
    pub function_symbols: FxHashMap<(usize, CallString), Symbol>,
    pub symbols: SymbolTable,
    /// Equations flagged during validation; their summaries read as zero.
    pub skipped: Vec<Symbol>,
    pub stats: SolverStats,
    pub flags: SolveFlags,
}

impl<V, F> EngineResult<V, F> {
    pub fn block_fact(&self, block: BlockId, cs: &CallString) -> Option<&F> {
        let sym = self.block_symbols.get(&(block, cs.clone()))?;
        self.block_entry_facts.get(sym)
    }

    pub fn function_summary(&self, function: usize, cs: &CallString) -> Option<&V> {
        let sym = self.function_symbols.get(&(function, cs.clone()))?;
        self.summaries.get(sym)
    }
}
