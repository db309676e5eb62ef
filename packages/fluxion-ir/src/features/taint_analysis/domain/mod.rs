/*
 * Taint Domain Models
 *
 * Facts: the zero fact, a tainted SSA value, or tainted memory reached
 * through a pointer (alias classes are resolved by the oracle at loads).
 * Specifications describe, per external function name, which positions
 * produce taint, which are checked as sinks, and how taint pipes through.
 */

use crate::features::ifds::domain::FlowFact;
use crate::shared::models::{InstId, SourceLoc, ValueId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaintFact {
    Zero,
    /// The SSA value itself carries taint.
    Value(ValueId),
    /// The memory reachable through this pointer carries taint.
    Memory(ValueId),
}

impl FlowFact for TaintFact {
    fn zero() -> Self {
        TaintFact::Zero
    }

    fn is_zero(&self) -> bool {
        matches!(self, TaintFact::Zero)
    }
}

/// How a position is accessed: the value itself or the memory behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    Value,
    Deref,
}

/// Which argument or return slot a descriptor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Arg(usize),
    /// Every argument after (and including) the given index.
    AfterArg(usize),
    Ret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintPos {
    pub position: Position,
    pub mode: AccessMode,
}

impl TaintPos {
    pub fn new(position: Position, mode: AccessMode) -> Self {
        Self { position, mode }
    }

    /// Argument indices this position selects for a call with `argc` args.
    pub fn arg_indices(&self, argc: usize) -> Vec<usize> {
        match self.position {
            Position::Arg(i) => (i < argc).then_some(i).into_iter().collect(),
            Position::AfterArg(i) => (i..argc).collect(),
            Position::Ret => Vec::new(),
        }
    }
}

/// Taint flow through a function, e.g. `arg0D->retV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeSpec {
    pub from: TaintPos,
    pub to: TaintPos,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionTaintSpec {
    pub sources: Vec<TaintPos>,
    pub sinks: Vec<TaintPos>,
    pub pipes: Vec<PipeSpec>,
    pub ignored: bool,
}

impl FunctionTaintSpec {
    pub fn is_source(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        !self.sinks.is_empty()
    }
}

/// Immutable taint configuration, loaded once and passed to the analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaintSpecConfig {
    functions: FxHashMap<String, FunctionTaintSpec>,
}

impl TaintSpecConfig {
    pub fn insert(&mut self, name: impl Into<String>, spec: FunctionTaintSpec) {
        self.functions.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionTaintSpec> {
        self.functions.get(name).filter(|s| !s.ignored)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionTaintSpec)> {
        self.functions.iter()
    }
}

/// One hop of a source-to-sink trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub inst: InstId,
    pub loc: Option<SourceLoc>,
}

/// A reported source → sink flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintReport {
    pub source: TraceStep,
    pub sink: TraceStep,
    /// Full hop sequence, source first, sink last.
    pub steps: Vec<TraceStep>,
    pub sink_function: String,
}
