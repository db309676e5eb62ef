/*
 * ICFG Construction
 *
 * Builds the interprocedural CFG from a finalized module: one IntraBlock
 * node per basic block, intra edges along block successors, and for every
 * direct call to a defined function a CallCF edge into the callee's entry
 * block plus RetCF edges from each callee exit block back to the caller
 * block, all carrying the call-instruction handle. Calls to declarations
 * and indirect calls contribute no interprocedural edges; the engines
 * summarize them at the call site.
 */

use crate::features::icfg::infrastructure::graph::Icfg;
use crate::shared::models::{Callee, FluxionError, InstKind, ModuleIndex, Result};
use tracing::debug;

pub fn build_icfg(module: &ModuleIndex) -> Result<Icfg> {
    let mut icfg = Icfg::new();

    // Nodes and intra edges.
    for (fi, func) in module.functions().iter().enumerate() {
        if func.is_declaration() {
            continue;
        }
        let entry = func
            .entry_block()
            .ok_or_else(|| FluxionError::malformed_ir("missing entry block", &func.name))?;
        let entry_id = entry.id;
        for block in &func.blocks {
            icfg.ensure_block_node(block.id, fi, block.id == entry_id);
        }
        for block in &func.blocks {
            let src = icfg.block_node(block.id).expect("node just inserted");
            for &succ in &block.succs {
                let dst = icfg
                    .block_node(succ)
                    .ok_or_else(|| FluxionError::malformed_ir("dangling successor", succ))?;
                icfg.add_intra_edge(src, dst)?;
            }
        }
    }

    // Call and return edges.
    for func in module.functions() {
        for block in &func.blocks {
            let Some(src) = icfg.block_node(block.id) else {
                continue;
            };
            for inst in &block.insts {
                let InstKind::Call {
                    callee: Callee::Direct(name),
                    ..
                } = &inst.kind
                else {
                    continue;
                };
                let Some(target) = module.function(name).filter(|f| !f.is_declaration()) else {
                    continue;
                };
                let target_idx = module.function_index(name).expect("function resolved");
                let callee_entry = icfg
                    .function_entry(target_idx)
                    .ok_or_else(|| FluxionError::malformed_ir("missing entry block", name))?;
                icfg.add_call_edge(src, callee_entry, inst.id);
                for exit_block in target.blocks.iter().filter(|b| b.is_exit()) {
                    let exit_node = icfg.block_node(exit_block.id).expect("node exists");
                    icfg.add_ret_edge(exit_node, src, inst.id);
                }
            }
        }
    }

    debug!(
        nodes = icfg.node_count(),
        edges = icfg.edge_count(),
        "icfg built"
    );
    Ok(icfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::icfg::domain::IcfgEdge;
    use crate::shared::models::{Block, BlockId, Function, Inst, InstId, Module, ValueId};

    fn call_inst(id: u32, target: &str) -> Inst {
        Inst {
            id: InstId(id),
            kind: InstKind::Call {
                callee: Callee::Direct(target.into()),
                args: vec![],
                result: Some(ValueId(100 + id)),
            },
            loc: None,
        }
    }

    fn ret_inst(id: u32) -> Inst {
        Inst {
            id: InstId(id),
            kind: InstKind::Return { value: None },
            loc: None,
        }
    }

    /// f calls g once; g is a single-block function.
    fn caller_callee_module() -> ModuleIndex {
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "f".into(),
            params: vec![],
            blocks: vec![Block {
                id: BlockId(0),
                insts: vec![call_inst(0, "g"), ret_inst(1)],
                succs: vec![],
            }],
        });
        module.functions.push(Function {
            name: "g".into(),
            params: vec![],
            blocks: vec![Block {
                id: BlockId(1),
                insts: vec![ret_inst(2)],
                succs: vec![],
            }],
        });
        module.finalize().unwrap()
    }

    #[test]
    fn one_call_edge_one_ret_edge() {
        let module = caller_callee_module();
        let icfg = build_icfg(&module).unwrap();
        assert_eq!(icfg.node_count(), 2);

        let calls: Vec<_> = icfg
            .edges()
            .filter(|(_, _, e)| matches!(e, IcfgEdge::CallCf(_)))
            .collect();
        let rets: Vec<_> = icfg
            .edges()
            .filter(|(_, _, e)| matches!(e, IcfgEdge::RetCf(_)))
            .collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(rets.len(), 1);

        // Both carry the call-instruction handle and mirror each other.
        let (call_src, call_dst, call_edge) = calls[0];
        let (ret_src, ret_dst, ret_edge) = rets[0];
        assert_eq!(call_edge.call_site(), Some(InstId(0)));
        assert_eq!(ret_edge.call_site(), Some(InstId(0)));
        assert_eq!(call_src, ret_dst);
        assert_eq!(call_dst, ret_src);
    }

    #[test]
    fn external_calls_add_no_edges() {
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "f".into(),
            params: vec![],
            blocks: vec![Block {
                id: BlockId(0),
                insts: vec![call_inst(0, "printf"), ret_inst(1)],
                succs: vec![],
            }],
        });
        module.functions.push(Function {
            name: "printf".into(),
            params: vec![],
            blocks: vec![],
        });
        let index = module.finalize().unwrap();
        let icfg = build_icfg(&index).unwrap();
        assert_eq!(icfg.edge_count(), 0);
    }
}
