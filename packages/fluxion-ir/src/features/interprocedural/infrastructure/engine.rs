/*
 * Context-Sensitive Interprocedural Engine
 *
 * Phase 1 discovers reachable (function, context) pairs with a worklist
 * and emits one equation per basic block: the block's symbol equals the
 * fold of its instruction transfers over the block's entry expression,
 * which is the ndet of its predecessors' symbols (same context) or the
 * identity for the entry block. Internal calls push the call site onto
 * the context and wrap the path in entry transfer, callee summary and
 * return transfer; external and indirect calls apply an opaque
 * call-to-return transfer. The function's exit symbol is the ndet of its
 * terminator-block symbols. The system is solved by Newton.
 *
 * Phase 2 pushes an entry fact top-down through every reachable context:
 * a block's entry fact is the solved path summary applied to the
 * function's input fact; at each internal call the fact reaching the
 * call is converted into the callee's input and joined into its slot,
 * re-enqueueing the callee while its input keeps growing.
 */

use crate::features::expression::infrastructure::eval::{eval_value, Bindings};
use crate::features::expression::{Exp0, ExprArena, ExprId};
use crate::features::icfg::Icfg;
use crate::features::interprocedural::domain::{EngineConfig, EngineResult};
use crate::features::interprocedural::ports::TransferFactory;
use crate::features::npa::{solve_newton, EquationSystem, SolverConfig};
use crate::features::semiring::Semiring;
use crate::shared::models::{
    BlockId, CallString, Callee, FluxionError, Function, Inst, InstKind, ModuleIndex, Result,
    Symbol, SymbolTable,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::{debug, info};

pub struct InterproceduralEngine<'a, D: Semiring, T: TransferFactory<D>> {
    dom: &'a D,
    module: &'a ModuleIndex,
    icfg: &'a Icfg,
    factory: &'a T,
    config: EngineConfig,
    symbols: SymbolTable,
    block_symbols: FxHashMap<(BlockId, CallString), Symbol>,
    function_symbols: FxHashMap<(usize, CallString), Symbol>,
}

impl<'a, D: Semiring, T: TransferFactory<D>> InterproceduralEngine<'a, D, T> {
    pub fn new(
        dom: &'a D,
        module: &'a ModuleIndex,
        icfg: &'a Icfg,
        factory: &'a T,
        config: EngineConfig,
    ) -> Self {
        Self {
            dom,
            module,
            icfg,
            factory,
            config,
            symbols: SymbolTable::new(),
            block_symbols: FxHashMap::default(),
            function_symbols: FxHashMap::default(),
        }
    }

    pub fn run(mut self) -> Result<EngineResult<D::Value, T::Fact>> {
        let mut system: EquationSystem<D> = EquationSystem::new();
        let seeds = self.seed_functions();
        if seeds.is_empty() {
            return Err(FluxionError::malformed_ir(
                "module has no defined functions",
                self.module.name(),
            ));
        }

        // Phase 1: reachable-context discovery and equation emission.
        let mut worklist: VecDeque<(usize, CallString)> = VecDeque::new();
        let mut visited: FxHashSet<(usize, CallString)> = FxHashSet::default();
        for &fi in &seeds {
            let item = (fi, CallString::root());
            visited.insert(item.clone());
            worklist.push_back(item);
        }

        while let Some((fi, cs)) = worklist.pop_front() {
            self.emit_function(fi, &cs, &mut system, &mut worklist, &mut visited)?;
        }
        info!(
            equations = system.len(),
            contexts = visited.len(),
            "interprocedural equation system built"
        );

        let skipped = self.validate_system(&mut system)?;

        let solver_config = SolverConfig {
            linear_strategy: self.config.linear_strategy,
            max_iterations: self.config.max_newton_iter,
            verbose: self.config.verbose,
        };
        let solution = solve_newton(self.dom, &mut system, &solver_config)?;

        // Phase 2: top-down fact propagation over the solved summaries.
        let facts = self.propagate_facts(&solution.values, &seeds)?;

        Ok(EngineResult {
            summaries: solution.values,
            block_entry_facts: facts,
            block_symbols: self.block_symbols,
            function_symbols: self.function_symbols,
            symbols: self.symbols,
            skipped,
            stats: solution.stats,
            flags: solution.flags,
        })
    }

    /// `main` if defined, otherwise every defined function.
    fn seed_functions(&self) -> Vec<usize> {
        if let Some(fi) = self.module.function_index("main") {
            if !self.module.functions()[fi].is_declaration() {
                return vec![fi];
            }
        }
        self.module
            .functions()
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_declaration())
            .map(|(fi, _)| fi)
            .collect()
    }

    fn function_symbol(&mut self, fi: usize, cs: &CallString) -> Symbol {
        if let Some(&sym) = self.function_symbols.get(&(fi, cs.clone())) {
            return sym;
        }
        let name = format!("{}{}", self.module.functions()[fi].name, cs);
        let sym = self.symbols.intern(&name);
        self.function_symbols.insert((fi, cs.clone()), sym);
        sym
    }

    fn block_symbol(&mut self, block: BlockId, cs: &CallString) -> Symbol {
        if let Some(&sym) = self.block_symbols.get(&(block, cs.clone())) {
            return sym;
        }
        let name = format!("{block}{cs}");
        let sym = self.symbols.intern(&name);
        self.block_symbols.insert((block, cs.clone()), sym);
        sym
    }

    /// Predecessor blocks of `block` along intra edges of the ICFG.
    fn intra_predecessors(&self, block: BlockId) -> Vec<BlockId> {
        let Some(node) = self.icfg.block_node(block) else {
            return Vec::new();
        };
        self.icfg
            .predecessors(node)
            .filter(|(_, e)| e.is_intra())
            .filter_map(|(src, _)| self.icfg.node(src).block())
            .collect()
    }

    /// Resolve a call instruction to a defined callee's function index.
    fn internal_callee(&self, inst: &Inst) -> Option<(usize, &'a Function)> {
        let InstKind::Call {
            callee: Callee::Direct(name),
            ..
        } = &inst.kind
        else {
            return None;
        };
        let fi = self.module.function_index(name)?;
        let func = &self.module.functions()[fi];
        (!func.is_declaration()).then_some((fi, func))
    }

    fn emit_function(
        &mut self,
        fi: usize,
        cs: &CallString,
        system: &mut EquationSystem<D>,
        worklist: &mut VecDeque<(usize, CallString)>,
        visited: &mut FxHashSet<(usize, CallString)>,
    ) -> Result<()> {
        let func = &self.module.functions()[fi];
        let f_sym = self.function_symbol(fi, cs);
        let entry_id = func
            .entry_block()
            .ok_or_else(|| FluxionError::malformed_ir("missing entry block", &func.name))?
            .id;

        let mut exit_expr: Option<ExprId> = None;
        for block in &func.blocks {
            let b_sym = self.block_symbol(block.id, cs);

            // Entry expression: identity at the function entry, otherwise
            // the ndet of all predecessor symbols in the same context.
            let preds = self.intra_predecessors(block.id);
            let arena = system.arena_mut();
            let mut in_expr = if block.id == entry_id {
                let one = self.dom.one();
                arena.term(one)
            } else if preds.is_empty() {
                let zero = self.dom.zero();
                arena.term(zero)
            } else {
                let mut expr: Option<ExprId> = None;
                for pred in preds {
                    let p_sym = self.block_symbol(pred, cs);
                    let arena = system.arena_mut();
                    let hole = arena.hole(p_sym);
                    expr = Some(match expr {
                        None => hole,
                        Some(prev) => arena.ndet(prev, hole),
                    });
                }
                expr.expect("predecessor list non-empty")
            };

            for inst in &block.insts {
                if let Some((callee_fi, callee)) = self.internal_callee(inst) {
                    let callee_cs = cs.push(inst.id, self.config.k_cfa_depth);
                    let item = (callee_fi, callee_cs.clone());
                    if visited.insert(item.clone()) {
                        worklist.push_back(item);
                    }
                    let entry_tf = self.factory.call_entry_transfer(self.dom, inst, callee);
                    let ret_tf = self.factory.call_return_transfer(self.dom, inst, callee);
                    let callee_sym = self.function_symbol(callee_fi, &callee_cs);
                    let arena = system.arena_mut();
                    in_expr = arena.seq(entry_tf, in_expr);
                    in_expr = arena.call(callee_sym, in_expr);
                    in_expr = arena.seq(ret_tf, in_expr);
                } else if inst.kind.is_call() {
                    let tf = self.factory.call_to_return_transfer(self.dom, inst);
                    in_expr = system.arena_mut().seq(tf, in_expr);
                }
                in_expr = self
                    .factory
                    .transfer(self.dom, inst, system.arena_mut(), in_expr);
            }

            system.define(b_sym, in_expr)?;

            if block.is_exit() {
                let arena = system.arena_mut();
                let hole = arena.hole(b_sym);
                exit_expr = Some(match exit_expr {
                    None => hole,
                    Some(prev) => arena.ndet(prev, hole),
                });
            }
        }

        let exit_expr = match exit_expr {
            Some(e) => e,
            None => {
                let zero = self.dom.zero();
                system.arena_mut().term(zero)
            }
        };
        system.define(f_sym, exit_expr)?;
        Ok(())
    }

    /// Flag equations whose call targets were never defined and replace
    /// their right-hand sides with zero so the solve proceeds; downstream
    /// the flagged summaries contribute nothing.
    fn validate_system(&self, system: &mut EquationSystem<D>) -> Result<Vec<Symbol>> {
        let defined: FxHashSet<Symbol> = system.iter().map(|(s, _)| s).collect();
        let mut flagged = Vec::new();
        for (sym, expr) in system.iter() {
            if references_undefined(system.arena(), expr, &defined) {
                flagged.push(sym);
            }
        }
        for &sym in &flagged {
            let zero = self.dom.zero();
            let z = system.arena_mut().term(zero);
            system.replace(sym, z)?;
        }
        if !flagged.is_empty() {
            debug!(count = flagged.len(), "equations flagged during validation");
        }
        Ok(flagged)
    }

    fn propagate_facts(
        &mut self,
        solved: &FxHashMap<Symbol, D::Value>,
        seeds: &[usize],
    ) -> Result<FxHashMap<Symbol, T::Fact>> {
        let mut facts: FxHashMap<Symbol, T::Fact> = FxHashMap::default();
        let mut func_input: FxHashMap<Symbol, T::Fact> = FxHashMap::default();
        let mut worklist: VecDeque<(usize, CallString)> = VecDeque::new();
        let mut queued: FxHashSet<(usize, CallString)> = FxHashSet::default();

        for &fi in seeds {
            let sym = self.function_symbol(fi, &CallString::root());
            func_input.insert(sym, self.factory.entry_fact());
            let item = (fi, CallString::root());
            queued.insert(item.clone());
            worklist.push_back(item);
        }

        let nu: Bindings<D::Value> = solved.clone();
        while let Some((fi, cs)) = worklist.pop_front() {
            queued.remove(&(fi, cs.clone()));
            let func = &self.module.functions()[fi];
            let f_sym = self.function_symbol(fi, &cs);
            let Some(input) = func_input.get(&f_sym).cloned() else {
                continue;
            };
            let entry_id = match func.entry_block() {
                Some(b) => b.id,
                None => continue,
            };

            for block in &func.blocks {
                let b_sym = self.block_symbol(block.id, &cs);
                if !solved.contains_key(&b_sym) {
                    continue;
                }

                // Path value from function entry to this block's start.
                let entry_to_block = if block.id == entry_id {
                    self.dom.one()
                } else {
                    let mut acc: Option<D::Value> = None;
                    for pred in self.intra_predecessors(block.id) {
                        let p_sym = self.block_symbol(pred, &cs);
                        if let Some(v) = solved.get(&p_sym) {
                            acc = Some(match acc {
                                None => v.clone(),
                                Some(prev) => self.dom.combine(&prev, v),
                            });
                        }
                    }
                    acc.unwrap_or_else(|| self.dom.zero())
                };

                facts.insert(b_sym, self.factory.apply_summary(&entry_to_block, &input));

                // Walk the block, propagating facts into internal callees.
                let mut scratch: ExprArena<D> = ExprArena::new();
                let one = self.dom.one();
                let mut path = scratch.term(one);
                for inst in &block.insts {
                    if let Some((callee_fi, callee)) = self.internal_callee(inst) {
                        let callee_cs = cs.push(inst.id, self.config.k_cfa_depth);
                        let callee_sym = self.function_symbol(callee_fi, &callee_cs);

                        let path_val = eval_value(self.dom, &scratch, &nu, &nu, path)?;
                        let entry_tf = self.factory.call_entry_transfer(self.dom, inst, callee);
                        let to_entry = self.dom.extend(&entry_tf, &path_val);
                        let to_call = self.dom.extend(&to_entry, &entry_to_block);
                        let fact_at_call = self.factory.apply_summary(&to_call, &input);

                        let grew = match func_input.get(&callee_sym) {
                            None => {
                                func_input.insert(callee_sym, fact_at_call);
                                true
                            }
                            Some(old) => {
                                let joined = self.factory.join_facts(old, &fact_at_call);
                                if self.factory.facts_equal(old, &joined) {
                                    false
                                } else {
                                    func_input.insert(callee_sym, joined);
                                    true
                                }
                            }
                        };
                        if grew {
                            let item = (callee_fi, callee_cs.clone());
                            if queued.insert(item.clone()) {
                                worklist.push_back(item);
                            }
                        }

                        let ret_tf = self.factory.call_return_transfer(self.dom, inst, callee);
                        path = scratch.seq(entry_tf, path);
                        path = scratch.call(callee_sym, path);
                        path = scratch.seq(ret_tf, path);
                    } else if inst.kind.is_call() {
                        let tf = self.factory.call_to_return_transfer(self.dom, inst);
                        path = scratch.seq(tf, path);
                    }
                    path = self.factory.transfer(self.dom, inst, &mut scratch, path);
                }
            }
        }
        Ok(facts)
    }
}

/// Whether an expression mentions a `Call` symbol outside `defined`.
fn references_undefined<D: Semiring>(
    arena: &ExprArena<D>,
    expr: ExprId,
    defined: &FxHashSet<Symbol>,
) -> bool {
    match arena.node(expr) {
        Exp0::Term(_) | Exp0::Hole(_) => false,
        Exp0::Seq { rest, .. } => references_undefined(arena, *rest, defined),
        Exp0::Call { callee, arg } => {
            !defined.contains(callee) || references_undefined(arena, *arg, defined)
        }
        Exp0::Cond { then_e, else_e, .. } => {
            references_undefined(arena, *then_e, defined)
                || references_undefined(arena, *else_e, defined)
        }
        Exp0::Ndet { left, right } | Exp0::Concat { left, right, .. } => {
            references_undefined(arena, *left, defined)
                || references_undefined(arena, *right, defined)
        }
        Exp0::Closure { body, .. } => references_undefined(arena, *body, defined),
    }
}
