/*
 * PDG Construction
 *
 * Builds the dependence graph from a finalized module:
 *
 *   data:      def-use edges from each defining node to its users, with
 *              the operand role recorded for memory instructions;
 *              read-after-write edges from stores to may-aliased loads;
 *              return edges from returned defs to the formal-out slot;
 *              value-dep edges from actual-out slots to call results.
 *   control:   entry edges from the function-entry node to every
 *              instruction; branch edges from conditional terminators to
 *              the instructions of their successor blocks; call
 *              invocation and return crossings.
 *   parameter: actual-in/formal-in and formal-out/actual-out passing for
 *              direct calls to defined functions.
 */

use crate::features::pdg::domain::{OperandRole, PdgEdgeKind, PdgNode, PdgNodeKey};
use crate::features::pdg::infrastructure::graph::Pdg;
use crate::features::taint_analysis::ports::AliasOracle;
use crate::shared::models::{Callee, Function, InstId, InstKind, ModuleIndex, Result, ValueId};
use rustc_hash::FxHashMap;
use tracing::debug;

pub struct PdgBuilder<'a, A: AliasOracle> {
    module: &'a ModuleIndex,
    oracle: &'a A,
}

impl<'a, A: AliasOracle> PdgBuilder<'a, A> {
    pub fn new(module: &'a ModuleIndex, oracle: &'a A) -> Self {
        Self { module, oracle }
    }

    pub fn build(&self) -> Result<Pdg> {
        let mut pdg = Pdg::new();

        // Node for the definition site of a value, used for def-use edges.
        let mut def_node: FxHashMap<ValueId, PdgNodeKey> = FxHashMap::default();

        for global in self.module.globals() {
            let key = PdgNodeKey::Global(global.id);
            pdg.add_node(PdgNode::new(key).with_value(global.id));
            def_node.insert(global.id, key);
        }

        for (fi, func) in self.module.functions().iter().enumerate() {
            if func.is_declaration() {
                continue;
            }
            pdg.add_node(PdgNode::new(PdgNodeKey::FunctionEntry(fi)));
            for (pi, &param) in func.params.iter().enumerate() {
                let key = PdgNodeKey::FormalIn {
                    function: fi,
                    index: pi,
                };
                pdg.add_node(PdgNode::new(key).with_value(param));
                def_node.insert(param, key);
            }
            for block in &func.blocks {
                for inst in &block.insts {
                    let key = PdgNodeKey::Inst(inst.id);
                    let mut node = PdgNode::new(key).with_loc(inst.loc.clone());
                    if let Some(result) = inst.kind.result() {
                        node = node.with_value(result);
                        def_node.insert(result, key);
                    }
                    pdg.add_node(node);
                }
            }
        }

        for (fi, func) in self.module.functions().iter().enumerate() {
            if func.is_declaration() {
                continue;
            }
            self.add_control_edges(&mut pdg, fi, func)?;
            self.add_data_edges(&mut pdg, func, &def_node)?;
            self.add_call_edges(&mut pdg, func, &def_node)?;
        }
        self.add_memory_edges(&mut pdg)?;

        debug!(
            nodes = pdg.node_count(),
            edges = pdg.edge_count(),
            "pdg built"
        );
        Ok(pdg)
    }

    fn add_control_edges(&self, pdg: &mut Pdg, fi: usize, func: &Function) -> Result<()> {
        let entry = PdgNodeKey::FunctionEntry(fi);
        for block in &func.blocks {
            for inst in &block.insts {
                pdg.add_edge(entry, PdgNodeKey::Inst(inst.id), PdgEdgeKind::ControlEntry)?;
            }
        }
        // Conditional terminators control the instructions of their
        // successor blocks.
        for block in &func.blocks {
            let Some(term) = block.terminator() else {
                continue;
            };
            if !matches!(term.kind, InstKind::CondBranch { .. }) {
                continue;
            }
            for &succ in &block.succs {
                let Some(target) = self.module.block(succ) else {
                    continue;
                };
                for inst in &target.insts {
                    pdg.add_edge(
                        PdgNodeKey::Inst(term.id),
                        PdgNodeKey::Inst(inst.id),
                        PdgEdgeKind::ControlBranch,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn add_data_edges(
        &self,
        pdg: &mut Pdg,
        func: &Function,
        def_node: &FxHashMap<ValueId, PdgNodeKey>,
    ) -> Result<()> {
        for block in &func.blocks {
            for inst in &block.insts {
                let user = PdgNodeKey::Inst(inst.id);
                let pointer = inst.kind.pointer_operand();
                for op in inst.kind.operands() {
                    let Some(&def) = def_node.get(&op) else {
                        continue;
                    };
                    let role = if pointer == Some(op) && inst.kind.is_field_access() {
                        OperandRole::Pointer
                    } else {
                        OperandRole::Value
                    };
                    pdg.add_edge(def, user, PdgEdgeKind::DefUse { role })?;
                }
                // Reads of module globals get their own data edge.
                if let InstKind::Load { pointer, .. } = &inst.kind {
                    if self.module.is_global(*pointer) {
                        pdg.add_edge(PdgNodeKey::Global(*pointer), user, PdgEdgeKind::Read)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn add_call_edges(
        &self,
        pdg: &mut Pdg,
        func: &Function,
        def_node: &FxHashMap<ValueId, PdgNodeKey>,
    ) -> Result<()> {
        for block in &func.blocks {
            for inst in &block.insts {
                let InstKind::Call {
                    callee: Callee::Direct(name),
                    args,
                    result,
                } = &inst.kind
                else {
                    continue;
                };
                let Some(callee_fi) = self.module.function_index(name) else {
                    continue;
                };
                let callee = &self.module.functions()[callee_fi];
                if callee.is_declaration() {
                    continue;
                }

                let call_key = PdgNodeKey::Inst(inst.id);
                pdg.add_edge(
                    call_key,
                    PdgNodeKey::FunctionEntry(callee_fi),
                    PdgEdgeKind::CallInvocation,
                )?;

                // Actual-in chain per argument position.
                for (i, arg) in args.iter().enumerate() {
                    if i >= callee.params.len() {
                        break;
                    }
                    let actual = PdgNodeKey::ActualIn { call: inst.id, index: i };
                    pdg.add_node(PdgNode::new(actual).with_value(*arg));
                    if let Some(&def) = def_node.get(arg) {
                        pdg.add_edge(
                            def,
                            actual,
                            PdgEdgeKind::DefUse {
                                role: OperandRole::Value,
                            },
                        )?;
                    }
                    let formal = PdgNodeKey::FormalIn {
                        function: callee_fi,
                        index: i,
                    };
                    pdg.add_edge(actual, formal, PdgEdgeKind::ParamIn)?;
                }

                // Return chain: returned defs → formal-out → actual-out →
                // the call result's users (via value-dep).
                let formal_out = PdgNodeKey::FormalOut {
                    function: callee_fi,
                };
                pdg.add_node(PdgNode::new(formal_out));
                for ret_block in &callee.blocks {
                    for ret_inst in &ret_block.insts {
                        if let InstKind::Return { value: Some(v) } = &ret_inst.kind {
                            if def_node.contains_key(v) {
                                pdg.add_edge(
                                    PdgNodeKey::Inst(ret_inst.id),
                                    formal_out,
                                    PdgEdgeKind::Return,
                                )?;
                            }
                        }
                        if ret_inst.kind.is_return() {
                            pdg.add_edge(
                                PdgNodeKey::Inst(ret_inst.id),
                                call_key,
                                PdgEdgeKind::CallReturn,
                            )?;
                        }
                    }
                }
                if result.is_some() {
                    let actual_out = PdgNodeKey::ActualOut { call: inst.id };
                    pdg.add_node(PdgNode::new(actual_out));
                    pdg.add_edge(formal_out, actual_out, PdgEdgeKind::ParamOut)?;
                    pdg.add_edge(actual_out, call_key, PdgEdgeKind::ValueDep)?;
                }
            }
        }
        Ok(())
    }

    /// Stores feed may-aliased loads (weak, flow-insensitive).
    fn add_memory_edges(&self, pdg: &mut Pdg) -> Result<()> {
        let stores: Vec<(InstId, ValueId)> = self
            .module
            .insts()
            .filter_map(|i| match &i.kind {
                InstKind::Store { pointer, .. } => Some((i.id, *pointer)),
                _ => None,
            })
            .collect();
        for inst in self.module.insts() {
            let InstKind::Load { pointer, .. } = &inst.kind else {
                continue;
            };
            for &(store, store_ptr) in &stores {
                if self.oracle.may_alias(store_ptr, *pointer) {
                    pdg.add_edge(
                        PdgNodeKey::Inst(store),
                        PdgNodeKey::Inst(inst.id),
                        PdgEdgeKind::ReadAfterWrite,
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::taint_analysis::ports::IdentityAliasOracle;
    use crate::shared::models::{Block, BlockId, Inst, Module};

    /// store 42 to %p, load it back, add, return.
    fn store_load_module() -> ModuleIndex {
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "main".into(),
            params: vec![],
            blocks: vec![Block {
                id: BlockId(0),
                insts: vec![
                    Inst {
                        id: InstId(0),
                        kind: InstKind::Alloca { result: ValueId(0) },
                        loc: None,
                    },
                    Inst {
                        id: InstId(1),
                        kind: InstKind::Const {
                            result: ValueId(1),
                            value: 42,
                        },
                        loc: None,
                    },
                    Inst {
                        id: InstId(2),
                        kind: InstKind::Store {
                            value: ValueId(1),
                            pointer: ValueId(0),
                        },
                        loc: None,
                    },
                    Inst {
                        id: InstId(3),
                        kind: InstKind::Load {
                            result: ValueId(2),
                            pointer: ValueId(0),
                        },
                        loc: None,
                    },
                    Inst {
                        id: InstId(4),
                        kind: InstKind::Return {
                            value: Some(ValueId(2)),
                        },
                        loc: None,
                    },
                ],
                succs: vec![],
            }],
        });
        module.finalize().unwrap()
    }

    #[test]
    fn store_to_load_gets_raw_edge() {
        let module = store_load_module();
        let oracle = IdentityAliasOracle;
        let pdg = PdgBuilder::new(&module, &oracle).build().unwrap();

        let load = pdg.node_index(PdgNodeKey::Inst(InstId(3))).unwrap();
        let in_kinds: Vec<_> = pdg.in_edges(load).map(|(_, k)| k).collect();
        assert!(in_kinds.contains(&PdgEdgeKind::ReadAfterWrite));
        assert!(in_kinds.contains(&PdgEdgeKind::DefUse {
            role: OperandRole::Pointer
        }));
    }

    #[test]
    fn global_reads_get_read_edges() {
        let mut module = Module::new("m");
        module.globals.push(crate::shared::models::GlobalVar {
            id: ValueId(100),
            name: "g".into(),
        });
        module.functions.push(Function {
            name: "main".into(),
            params: vec![],
            blocks: vec![Block {
                id: BlockId(0),
                insts: vec![
                    Inst {
                        id: InstId(0),
                        kind: InstKind::Load {
                            result: ValueId(1),
                            pointer: ValueId(100),
                        },
                        loc: None,
                    },
                    Inst {
                        id: InstId(1),
                        kind: InstKind::Return { value: None },
                        loc: None,
                    },
                ],
                succs: vec![],
            }],
        });
        let index = module.finalize().unwrap();
        let oracle = IdentityAliasOracle;
        let pdg = PdgBuilder::new(&index, &oracle).build().unwrap();

        let load = pdg.node_index(PdgNodeKey::Inst(InstId(0))).unwrap();
        let in_kinds: Vec<_> = pdg.in_edges(load).map(|(_, k)| k).collect();
        assert!(in_kinds.contains(&PdgEdgeKind::Read));
        assert!(pdg.node_index(PdgNodeKey::Global(ValueId(100))).is_some());
    }

    #[test]
    fn stored_value_edge_has_value_role() {
        let module = store_load_module();
        let oracle = IdentityAliasOracle;
        let pdg = PdgBuilder::new(&module, &oracle).build().unwrap();

        let store = pdg.node_index(PdgNodeKey::Inst(InstId(2))).unwrap();
        let in_kinds: Vec<_> = pdg.in_edges(store).collect();
        let value_edges: Vec<_> = in_kinds
            .iter()
            .filter(|(_, k)| {
                matches!(
                    k,
                    PdgEdgeKind::DefUse {
                        role: OperandRole::Value
                    }
                )
            })
            .collect();
        let pointer_edges: Vec<_> = in_kinds
            .iter()
            .filter(|(_, k)| {
                matches!(
                    k,
                    PdgEdgeKind::DefUse {
                        role: OperandRole::Pointer
                    }
                )
            })
            .collect();
        assert_eq!(value_edges.len(), 1, "stored value uses value role");
        assert_eq!(pointer_edges.len(), 1, "store pointer uses pointer role");
    }
}
