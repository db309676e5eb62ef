/*
 * Instruction-Level Supergraph Skeleton
 *
 * Precomputed structure the tabulation solver walks: normal successors
 * per instruction (falling through blocks and into successor blocks),
 * call-site records for direct calls to defined functions (callee entry,
 * callee exits, return sites), and per-function entry/exit instructions.
 */

use crate::shared::models::{Callee, FluxionError, InstId, InstKind, ModuleIndex, Result};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct CallSite {
    pub callee: usize,
    pub callee_entry: InstId,
    pub callee_exits: Vec<InstId>,
    pub return_sites: Vec<InstId>,
}

#[derive(Debug, Default)]
pub struct SupergraphSkeleton {
    normal_succs: FxHashMap<InstId, Vec<InstId>>,
    calls: FxHashMap<InstId, CallSite>,
    func_entry: FxHashMap<usize, InstId>,
    func_exits: FxHashMap<usize, Vec<InstId>>,
    func_of: FxHashMap<InstId, usize>,
}

impl SupergraphSkeleton {
    pub fn build(module: &ModuleIndex) -> Result<Self> {
        let mut graph = Self::default();

        for (fi, func) in module.functions().iter().enumerate() {
            if func.is_declaration() {
                continue;
            }
            let entry = func
                .entry_block()
                .and_then(|b| b.insts.first())
                .ok_or_else(|| FluxionError::malformed_ir("empty entry block", &func.name))?;
            graph.func_entry.insert(fi, entry.id);

            for block in &func.blocks {
                for (i, inst) in block.insts.iter().enumerate() {
                    graph.func_of.insert(inst.id, fi);
                    if inst.kind.is_return() {
                        graph.func_exits.entry(fi).or_default().push(inst.id);
                    }
                    let succs = graph.normal_succs.entry(inst.id).or_default();
                    if let Some(next) = block.insts.get(i + 1) {
                        succs.push(next.id);
                    } else {
                        for &sb in &block.succs {
                            if let Some(first) = module.block(sb).and_then(|b| b.insts.first()) {
                                succs.push(first.id);
                            }
                        }
                    }
                }
            }
        }

        // Call-site records, now that every entry/exit is known.
        for func in module.functions() {
            for block in &func.blocks {
                for inst in &block.insts {
                    let InstKind::Call {
                        callee: Callee::Direct(name),
                        ..
                    } = &inst.kind
                    else {
                        continue;
                    };
                    let Some(fi) = module.function_index(name) else {
                        continue;
                    };
                    if module.functions()[fi].is_declaration() {
                        continue;
                    }
                    let callee_entry = graph.func_entry[&fi];
                    let callee_exits = graph.func_exits.get(&fi).cloned().unwrap_or_default();
                    let return_sites = graph
                        .normal_succs
                        .get(&inst.id)
                        .cloned()
                        .unwrap_or_default();
                    graph.calls.insert(
                        inst.id,
                        CallSite {
                            callee: fi,
                            callee_entry,
                            callee_exits,
                            return_sites,
                        },
                    );
                }
            }
        }
        Ok(graph)
    }

    pub fn normal_successors(&self, inst: InstId) -> &[InstId] {
        self.normal_succs.get(&inst).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Call record for a direct call to a defined function.
    pub fn call_site(&self, inst: InstId) -> Option<&CallSite> {
        self.calls.get(&inst)
    }

    pub fn function_entry(&self, function: usize) -> Option<InstId> {
        self.func_entry.get(&function).copied()
    }

    pub fn function_of(&self, inst: InstId) -> Option<usize> {
        self.func_of.get(&inst).copied()
    }

    /// Whether `inst` is an exit of its function.
    pub fn is_exit(&self, inst: InstId) -> bool {
        self.function_of(inst)
            .and_then(|fi| self.func_exits.get(&fi))
            .is_some_and(|exits| exits.contains(&inst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Block, BlockId, Function, Inst, Module, ValueId};

    #[test]
    fn successors_cross_block_boundaries() {
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "f".into(),
            params: vec![],
            blocks: vec![
                Block {
                    id: BlockId(0),
                    insts: vec![
                        Inst {
                            id: InstId(0),
                            kind: InstKind::Assign {
                                result: ValueId(1),
                                operands: vec![],
                            },
                            loc: None,
                        },
                        Inst {
                            id: InstId(1),
                            kind: InstKind::Branch,
                            loc: None,
                        },
                    ],
                    succs: vec![BlockId(1)],
                },
                Block {
                    id: BlockId(1),
                    insts: vec![Inst {
                        id: InstId(2),
                        kind: InstKind::Return { value: None },
                        loc: None,
                    }],
                    succs: vec![],
                },
            ],
        });
        let index = module.finalize().unwrap();
        let graph = SupergraphSkeleton::build(&index).unwrap();
        assert_eq!(graph.normal_successors(InstId(0)), &[InstId(1)]);
        assert_eq!(graph.normal_successors(InstId(1)), &[InstId(2)]);
        assert!(graph.is_exit(InstId(2)));
        assert_eq!(graph.function_entry(0), Some(InstId(0)));
    }
}
