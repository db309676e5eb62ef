//! Shared IR construction helpers for the integration tests.

#![allow(dead_code)]

use fluxion_ir::shared::models::{
    Block, BlockId, Callee, Function, GlobalVar, Inst, InstId, InstKind, Module, SourceLoc,
    ValueId,
};

pub fn inst(id: u32, kind: InstKind) -> Inst {
    Inst {
        id: InstId(id),
        kind,
        loc: None,
    }
}

pub fn inst_at(id: u32, kind: InstKind, file: &str, line: u32) -> Inst {
    Inst {
        id: InstId(id),
        kind,
        loc: Some(SourceLoc::new(file, line, 1)),
    }
}

pub fn konst(id: u32, result: u32, value: i64) -> Inst {
    inst(
        id,
        InstKind::Const {
            result: ValueId(result),
            value,
        },
    )
}

pub fn assign(id: u32, result: u32, operands: &[u32]) -> Inst {
    inst(
        id,
        InstKind::Assign {
            result: ValueId(result),
            operands: operands.iter().map(|&v| ValueId(v)).collect(),
        },
    )
}

pub fn alloca(id: u32, result: u32) -> Inst {
    inst(
        id,
        InstKind::Alloca {
            result: ValueId(result),
        },
    )
}

pub fn load(id: u32, result: u32, pointer: u32) -> Inst {
    inst(
        id,
        InstKind::Load {
            result: ValueId(result),
            pointer: ValueId(pointer),
        },
    )
}

pub fn store(id: u32, value: u32, pointer: u32) -> Inst {
    inst(
        id,
        InstKind::Store {
            value: ValueId(value),
            pointer: ValueId(pointer),
        },
    )
}

pub fn call(id: u32, callee: &str, args: &[u32], result: Option<u32>) -> Inst {
    inst(
        id,
        InstKind::Call {
            callee: Callee::Direct(callee.into()),
            args: args.iter().map(|&v| ValueId(v)).collect(),
            result: result.map(ValueId),
        },
    )
}

pub fn ret(id: u32, value: Option<u32>) -> Inst {
    inst(
        id,
        InstKind::Return {
            value: value.map(ValueId),
        },
    )
}

pub fn branch(id: u32) -> Inst {
    inst(id, InstKind::Branch)
}

pub fn cond_branch(id: u32, cond: u32) -> Inst {
    inst(id, InstKind::CondBranch { cond: ValueId(cond) })
}

pub fn block(id: u32, insts: Vec<Inst>, succs: &[u32]) -> Block {
    Block {
        id: BlockId(id),
        insts,
        succs: succs.iter().map(|&b| BlockId(b)).collect(),
    }
}

pub fn func(name: &str, params: &[u32], blocks: Vec<Block>) -> Function {
    Function {
        name: name.into(),
        params: params.iter().map(|&v| ValueId(v)).collect(),
        blocks,
    }
}

pub fn declaration(name: &str) -> Function {
    Function {
        name: name.into(),
        params: vec![],
        blocks: vec![],
    }
}

pub fn module(name: &str, functions: Vec<Function>) -> Module {
    Module {
        name: name.into(),
        globals: Vec::new(),
        functions,
    }
}

pub fn module_with_globals(name: &str, globals: &[(u32, &str)], functions: Vec<Function>) -> Module {
    Module {
        name: name.into(),
        globals: globals
            .iter()
            .map(|&(id, gname)| GlobalVar {
                id: ValueId(id),
                name: gname.into(),
            })
            .collect(),
        functions,
    }
}
