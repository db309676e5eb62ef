/*
 * PDG Node and Edge Taxonomy
 *
 * Nodes wrap IR entities: instructions, formal/actual parameter slots,
 * function entries and globals. Edge kinds partition into data
 * dependence, control dependence and parameter passing; def-use edges
 * into memory instructions remember whether the used operand was the
 * pointer or the stored value, which is what thin slicing discriminates.
 */

use crate::shared::models::{InstId, SourceLoc, ValueId};
use serde::{Deserialize, Serialize};

/// Identity of a PDG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdgNodeKey {
    Inst(InstId),
    FormalIn { function: usize, index: usize },
    FormalOut { function: usize },
    ActualIn { call: InstId, index: usize },
    ActualOut { call: InstId },
    FunctionEntry(usize),
    Global(ValueId),
}

impl PdgNodeKey {
    pub fn call_site(&self) -> Option<InstId> {
        match self {
            PdgNodeKey::ActualIn { call, .. } | PdgNodeKey::ActualOut { call } => Some(*call),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdgNode {
    pub key: PdgNodeKey,
    /// IR value this node wraps, when there is one.
    pub value: Option<ValueId>,
    pub loc: Option<SourceLoc>,
}

impl PdgNode {
    pub fn new(key: PdgNodeKey) -> Self {
        Self {
            key,
            value: None,
            loc: None,
        }
    }

    pub fn with_value(mut self, value: ValueId) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_loc(mut self, loc: Option<SourceLoc>) -> Self {
        self.loc = loc;
        self
    }
}

/// Role of the used operand on a def-use edge into a memory instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandRole {
    /// The operand addresses memory (pointer of a load/store/gep).
    Pointer,
    /// The operand is the value flowing (stored value, loaded result).
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdgEdgeKind {
    // Data dependence.
    DefUse { role: OperandRole },
    ReadAfterWrite,
    Read,
    Alias,
    Return,
    ValueDep,
    // Control dependence.
    ControlEntry,
    ControlBranch,
    ControlIndirectBranch,
    CallInvocation,
    CallReturn,
    // Parameter passing.
    ParamIn,
    ParamOut,
    ParamField,
}

impl PdgEdgeKind {
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            PdgEdgeKind::DefUse { .. }
                | PdgEdgeKind::ReadAfterWrite
                | PdgEdgeKind::Read
                | PdgEdgeKind::Alias
                | PdgEdgeKind::Return
                | PdgEdgeKind::ValueDep
        )
    }

    pub fn is_control(&self) -> bool {
        matches!(
            self,
            PdgEdgeKind::ControlEntry
                | PdgEdgeKind::ControlBranch
                | PdgEdgeKind::ControlIndirectBranch
                | PdgEdgeKind::CallInvocation
                | PdgEdgeKind::CallReturn
        )
    }

    pub fn is_param(&self) -> bool {
        matches!(
            self,
            PdgEdgeKind::ParamIn | PdgEdgeKind::ParamOut | PdgEdgeKind::ParamField
        )
    }

    /// Edges thin slicing follows: data and parameter flow, minus
    /// base-pointer def-use.
    pub fn is_value_flow(&self) -> bool {
        if self.is_control() {
            return false;
        }
        !matches!(
            self,
            PdgEdgeKind::DefUse {
                role: OperandRole::Pointer
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_are_disjoint() {
        let kinds = [
            PdgEdgeKind::DefUse {
                role: OperandRole::Value,
            },
            PdgEdgeKind::ReadAfterWrite,
            PdgEdgeKind::Read,
            PdgEdgeKind::Alias,
            PdgEdgeKind::Return,
            PdgEdgeKind::ValueDep,
            PdgEdgeKind::ControlEntry,
            PdgEdgeKind::ControlBranch,
            PdgEdgeKind::ControlIndirectBranch,
            PdgEdgeKind::CallInvocation,
            PdgEdgeKind::CallReturn,
            PdgEdgeKind::ParamIn,
            PdgEdgeKind::ParamOut,
            PdgEdgeKind::ParamField,
        ];
        for kind in kinds {
            let memberships =
                [kind.is_data(), kind.is_control(), kind.is_param()]
                    .iter()
                    .filter(|&&b| b)
                    .count();
            assert_eq!(memberships, 1, "{kind:?} must sit in exactly one partition");
        }
    }

    #[test]
    fn base_pointer_def_use_is_not_value_flow() {
        assert!(!PdgEdgeKind::DefUse {
            role: OperandRole::Pointer
        }
        .is_value_flow());
        assert!(PdgEdgeKind::DefUse {
            role: OperandRole::Value
        }
        .is_value_flow());
        assert!(PdgEdgeKind::ReadAfterWrite.is_value_flow());
        assert!(!PdgEdgeKind::ControlBranch.is_value_flow());
    }
}
