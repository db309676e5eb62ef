/*
 * Normalized IR Model
 *
 * Concrete realization of the abstract IR surface the analysis core
 * consumes: a module of functions, functions of basic blocks, blocks of
 * instructions with stable u32 handles. Preprocessing that produces this
 * form (constant-expression expansion, global lowering, alias resolution)
 * is external; modules arrive already normalized, typically as JSON.
 *
 * `Module::finalize` derives the lookup maps the engines need and
 * validates structure: every defined function has an entry block, every
 * successor id resolves, every operand refers to a defined value.
 */

use crate::shared::models::error::{FluxionError, Result};
use crate::shared::models::span::SourceLoc;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of an SSA value (function parameter or instruction result).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Stable handle of an instruction, unique within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId(pub u32);

/// Stable handle of a basic block, unique within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Call target: a named function, or an unresolved indirect call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Callee {
    Direct(String),
    Indirect,
}

/// Instruction forms the analyses distinguish. `Assign` stands in for all
/// plain value-producing operations (arithmetic, casts, comparisons).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstKind {
    /// Integer literal materialization.
    Const {
        result: ValueId,
        value: i64,
    },
    Assign {
        result: ValueId,
        operands: Vec<ValueId>,
    },
    Phi {
        result: ValueId,
        operands: Vec<ValueId>,
    },
    Alloca {
        result: ValueId,
    },
    Load {
        result: ValueId,
        pointer: ValueId,
    },
    Store {
        value: ValueId,
        pointer: ValueId,
    },
    Gep {
        result: ValueId,
        base: ValueId,
        indices: Vec<ValueId>,
    },
    Call {
        callee: Callee,
        args: Vec<ValueId>,
        result: Option<ValueId>,
    },
    Branch,
    CondBranch {
        cond: ValueId,
    },
    Return {
        value: Option<ValueId>,
    },
}

impl InstKind {
    /// The value this instruction defines, if any.
    pub fn result(&self) -> Option<ValueId> {
        match self {
            InstKind::Const { result, .. }
            | InstKind::Assign { result, .. }
            | InstKind::Phi { result, .. }
            | InstKind::Alloca { result }
            | InstKind::Load { result, .. }
            | InstKind::Gep { result, .. } => Some(*result),
            InstKind::Call { result, .. } => *result,
            _ => None,
        }
    }

    /// All value operands, in operand order.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            InstKind::Assign { operands, .. } | InstKind::Phi { operands, .. } => operands.clone(),
            InstKind::Const { .. } | InstKind::Alloca { .. } | InstKind::Branch => Vec::new(),
            InstKind::Load { pointer, .. } => vec![*pointer],
            InstKind::Store { value, pointer } => vec![*value, *pointer],
            InstKind::Gep { base, indices, .. } => {
                let mut ops = vec![*base];
                ops.extend(indices.iter().copied());
                ops
            }
            InstKind::Call { args, .. } => args.clone(),
            InstKind::CondBranch { cond } => vec![*cond],
            InstKind::Return { value } => value.iter().copied().collect(),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, InstKind::Call { .. })
    }

    pub fn is_return(&self) -> bool {
        matches!(self, InstKind::Return { .. })
    }

    /// Memory access through a pointer operand (load/store/gep).
    pub fn is_field_access(&self) -> bool {
        matches!(
            self,
            InstKind::Load { .. } | InstKind::Store { .. } | InstKind::Gep { .. }
        )
    }

    /// Pointer operand of a memory access, if this is one.
    pub fn pointer_operand(&self) -> Option<ValueId> {
        match self {
            InstKind::Load { pointer, .. } | InstKind::Store { pointer, .. } => Some(*pointer),
            InstKind::Gep { base, .. } => Some(*base),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inst {
    pub id: InstId,
    pub kind: InstKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub insts: Vec<Inst>,
    /// Successor blocks within the same function.
    #[serde(default)]
    pub succs: Vec<BlockId>,
}

impl Block {
    pub fn terminator(&self) -> Option<&Inst> {
        self.insts.last()
    }

    /// A block with no successors terminates its function.
    pub fn is_exit(&self) -> bool {
        self.succs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ValueId>,
    /// Empty for declarations. The first block is the entry block.
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> Option<&Block> {
        self.blocks.first()
    }
}

/// Where a value was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefSite {
    Param { func: usize, index: usize },
    Inst(InstId),
    Global,
}

/// Module-level variable; its id is a pointer value usable as a load or
/// store operand anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVar {
    pub id: ValueId,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub globals: Vec<GlobalVar>,
    pub functions: Vec<Function>,
}

/// Module plus the derived lookup maps the engines use. Produced by
/// `Module::finalize`; read-only afterwards.
#[derive(Debug)]
pub struct ModuleIndex {
    module: Module,
    func_by_name: FxHashMap<String, usize>,
    block_func: FxHashMap<BlockId, usize>,
    block_pos: FxHashMap<BlockId, (usize, usize)>,
    inst_block: FxHashMap<InstId, BlockId>,
    preds: FxHashMap<BlockId, Vec<BlockId>>,
    defs: FxHashMap<ValueId, DefSite>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Validate the module and derive lookup maps.
    pub fn finalize(self) -> Result<ModuleIndex> {
        let mut func_by_name = FxHashMap::default();
        let mut block_func = FxHashMap::default();
        let mut block_pos = FxHashMap::default();
        let mut inst_block = FxHashMap::default();
        let mut preds: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();
        let mut defs = FxHashMap::default();

        for global in &self.globals {
            if defs.insert(global.id, DefSite::Global).is_some() {
                return Err(FluxionError::malformed_ir("value defined twice", global.id));
            }
        }

        for (fi, func) in self.functions.iter().enumerate() {
            if func_by_name.insert(func.name.clone(), fi).is_some() {
                return Err(FluxionError::malformed_ir(
                    "duplicate function name",
                    &func.name,
                ));
            }
            for (pi, &param) in func.params.iter().enumerate() {
                if defs
                    .insert(param, DefSite::Param { func: fi, index: pi })
                    .is_some()
                {
                    return Err(FluxionError::malformed_ir("value defined twice", param));
                }
            }
            for (bi, block) in func.blocks.iter().enumerate() {
                if block_func.insert(block.id, fi).is_some() {
                    return Err(FluxionError::malformed_ir("duplicate block id", block.id));
                }
                block_pos.insert(block.id, (fi, bi));
                for inst in &block.insts {
                    if inst_block.insert(inst.id, block.id).is_some() {
                        return Err(FluxionError::malformed_ir(
                            "duplicate instruction id",
                            inst.id,
                        ));
                    }
                    if let Some(result) = inst.kind.result() {
                        if defs.insert(result, DefSite::Inst(inst.id)).is_some() {
                            return Err(FluxionError::malformed_ir("value defined twice", result));
                        }
                    }
                }
            }
        }

        // Successor resolution + predecessor derivation, per function.
        for (fi, func) in self.functions.iter().enumerate() {
            for block in &func.blocks {
                for &succ in &block.succs {
                    match block_func.get(&succ) {
                        Some(&owner) if owner == fi => {
                            preds.entry(succ).or_default().push(block.id);
                        }
                        Some(_) => {
                            return Err(FluxionError::malformed_ir(
                                "successor belongs to another function",
                                succ,
                            ));
                        }
                        None => {
                            return Err(FluxionError::malformed_ir("dangling successor", succ));
                        }
                    }
                }
            }
        }

        // Operand resolution.
        for func in &self.functions {
            for block in &func.blocks {
                for inst in &block.insts {
                    for op in inst.kind.operands() {
                        if !defs.contains_key(&op) {
                            return Err(FluxionError::malformed_ir(
                                format!("dangling operand {op} in {}", inst.id),
                                inst.id,
                            ));
                        }
                    }
                }
            }
        }

        Ok(ModuleIndex {
            module: self,
            func_by_name,
            block_func,
            block_pos,
            inst_block,
            preds,
            defs,
        })
    }
}

impl ModuleIndex {
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    pub fn functions(&self) -> &[Function] {
        &self.module.functions
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.func_by_name.get(name).map(|&fi| &self.module.functions[fi])
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.func_by_name.get(name).copied()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.block_pos
            .get(&id)
            .map(|&(fi, bi)| &self.module.functions[fi].blocks[bi])
    }

    /// Function that owns a block.
    pub fn block_function(&self, id: BlockId) -> Option<&Function> {
        self.block_func.get(&id).map(|&fi| &self.module.functions[fi])
    }

    pub fn block_function_index(&self, id: BlockId) -> Option<usize> {
        self.block_func.get(&id).copied()
    }

    pub fn inst_parent_block(&self, id: InstId) -> Option<BlockId> {
        self.inst_block.get(&id).copied()
    }

    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        self.preds.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn def_site(&self, value: ValueId) -> Option<DefSite> {
        self.defs.get(&value).copied()
    }

    pub fn globals(&self) -> &[GlobalVar] {
        &self.module.globals
    }

    pub fn is_global(&self, value: ValueId) -> bool {
        matches!(self.defs.get(&value), Some(DefSite::Global))
    }

    pub fn inst(&self, id: InstId) -> Option<&Inst> {
        let block = self.block(self.inst_block.get(&id).copied()?)?;
        block.insts.iter().find(|i| i.id == id)
    }

    /// All instructions of all defined functions, in layout order.
    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.module
            .functions
            .iter()
            .flat_map(|f| f.blocks.iter())
            .flat_map(|b| b.insts.iter())
    }
}
