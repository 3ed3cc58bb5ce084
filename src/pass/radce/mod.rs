// Copyright (c) 2017-2021 Fabian Schuiki

//! Range Analysis Driven Dead Code Elimination
//!
//! Folds comparisons whose outcome is fixed by the value ranges of their
//! operands, turns conditional branches on the resulting constants into
//! unconditional ones, and removes the blocks that thereby become
//! unreachable. Each function is processed in three phases that run strictly
//! one after another:
//!
//! 1. `fold_comparisons` replaces decided comparisons with constants.
//! 2. `resolve_branches` rewrites branches on constants and collects the
//!    targets that lost an edge as dead candidates.
//! 3. `prune_dead_blocks` deletes the candidates that are unreachable and not
//!    address-taken, repairing edges and phi nodes around them.
//!
//! Ranges are never recomputed. Running the pass again on an unchanged range
//! table leaves the function untouched.

mod eval;
mod prune;
mod resolve;

pub use self::eval::evaluate;
pub use self::prune::prune_dead_blocks;
pub use self::resolve::{
    fold_comparisons, resolve_branches, DeadCandidates, FoldedComparisons, ResolvedBranches,
};

use crate::ir::prelude::*;
use crate::opt::prelude::*;

/// Range Analysis Driven Dead Code Elimination
///
/// This pass folds comparisons using value ranges, resolves the branches
/// that depend on them, and prunes the blocks no longer reachable.
pub struct RangeDeadCodeElim;

impl Pass for RangeDeadCodeElim {
    fn run_on_function(ctx: &PassContext, func: &mut FunctionBuilder) -> bool {
        info!("RADCE [{}]", func.name);
        let folded = fold_comparisons(ctx.ranges, func);
        let resolved = resolve_branches(func, &folded);
        let num_candidates = resolved.candidates.len();
        let removed = prune_dead_blocks(func, resolved.candidates);
        debug!(
            "RADCE [{}]: {} comparisons folded, {} branches resolved, {} of {} candidates removed",
            func.name,
            folded.len(),
            resolved.count,
            removed,
            num_candidates
        );
        !folded.is_empty() || resolved.count > 0 || removed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NoRanges, Range, RangeTable};
    use crate::ty::int_ty;
    use crate::value::IntValue;

    fn run(func: &mut Function, ranges: &RangeTable) -> bool {
        let ctx = PassContext::new(ranges);
        RangeDeadCodeElim::run_on_function(&ctx, &mut FunctionBuilder::new(func))
    }

    fn block(func: &Function, name: &str) -> Block {
        func.blocks()
            .find(|&bb| func.cfg.get_name(bb) == Some(name))
            .unwrap()
    }

    /// `%entry` compares `%x` against 5 and branches to `%then` or `%else`;
    /// `%then` falls through into `%else`, which merges `%x` and 5.
    fn diamond(then_addr_taken: bool) -> Function {
        let mut sig = Signature::new();
        sig.add_input(int_ty(32));
        sig.set_return_type(int_ty(32));
        let mut func = Function::new("f", sig);
        let x = func.arg_value(0);
        func.dfg.set_name(x, "x".to_string());
        let mut builder = FunctionBuilder::new(&mut func);
        let entry = builder.named_block("entry");
        let then = builder.named_block("then");
        let els = builder.named_block("else");
        if then_addr_taken {
            builder.set_address_taken(then);
        }
        builder.append_to(entry);
        let c5 = builder.ins().name("c5").const_int(IntValue::from_usize(32, 5));
        let cond = builder.ins().name("cond").slt(x, c5);
        builder.ins().br_cond(cond, then, els);
        builder.append_to(then);
        builder.ins().br(els);
        builder.append_to(els);
        let r = builder.ins().name("r").phi(vec![x, c5], vec![entry, then]);
        builder.ins().ret_value(r);
        func
    }

    fn x_in(func: &Function, lo: isize, hi: isize) -> RangeTable {
        let mut ranges = RangeTable::new();
        ranges.insert(func.name(), func.arg_value(0), Range::signed(32, lo, hi));
        ranges
    }

    #[test]
    fn decided_branch_removes_dead_block() {
        let mut func = diamond(false);
        let ranges = x_in(&func, 10, 20);
        let (entry, then, els) = (
            block(&func, "entry"),
            block(&func, "then"),
            block(&func, "else"),
        );
        assert!(run(&mut func, &ranges));
        assert!(!func.contains_block(then));
        assert_eq!(func.blocks().collect::<Vec<_>>(), vec![entry, els]);
        assert_eq!(func.successors(entry), &[els]);
        let pt = func.predtbl();
        assert_eq!(pt.pred_edges(els), &[entry]);
        let phi = func.phis(els).next().unwrap();
        assert_eq!(func.dfg[phi].blocks(), &[entry]);
        assert_eq!(func.dfg[phi].args(), &[func.arg_value(0)]);
        func.verify();
    }

    #[test]
    fn undecided_branch_changes_nothing() {
        let mut func = diamond(false);
        let ranges = x_in(&func, 0, 100);
        let before = func.dump().to_string();
        assert!(!run(&mut func, &ranges));
        assert_eq!(func.dump().to_string(), before);
        assert_eq!(func.blocks().count(), 3);
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut func = diamond(false);
        let ranges = x_in(&func, 10, 20);
        assert!(run(&mut func, &ranges));
        let after = func.dump().to_string();
        assert!(!run(&mut func, &ranges));
        assert_eq!(func.dump().to_string(), after);
    }

    #[test]
    fn address_taken_block_survives() {
        let mut func = diamond(true);
        let ranges = x_in(&func, 10, 20);
        let (entry, then, els) = (
            block(&func, "entry"),
            block(&func, "then"),
            block(&func, "else"),
        );
        assert!(run(&mut func, &ranges));
        assert!(func.contains_block(then));
        assert_eq!(func.successors(entry), &[els]);
        // %then still branches to %else, so its phi entry stays.
        let phi = func.phis(els).next().unwrap();
        assert_eq!(func.dfg[phi].blocks(), &[entry, then]);
        func.verify();
        assert!(!run(&mut func, &ranges));
    }

    #[test]
    fn taken_branch_keeps_reachable_merge() {
        // With %x < 5, %else loses the edge from %entry but stays reachable
        // through %then.
        let mut func = diamond(false);
        let ranges = x_in(&func, -100, 4);
        let (entry, then, els) = (
            block(&func, "entry"),
            block(&func, "then"),
            block(&func, "else"),
        );
        assert!(run(&mut func, &ranges));
        assert_eq!(func.blocks().collect::<Vec<_>>(), vec![entry, then, els]);
        assert_eq!(func.successors(entry), &[then]);
        let phi = func.phis(els).next().unwrap();
        assert_eq!(func.dfg[phi].blocks(), &[then]);
        func.verify();
    }

    #[test]
    fn without_ranges_only_constants_fold() {
        // `slt 3, 5` on two constants is decided without any range.
        let mut sig = Signature::new();
        sig.set_return_type(int_ty(8));
        let mut func = Function::new("k", sig);
        let mut builder = FunctionBuilder::new(&mut func);
        let entry = builder.block();
        let yes = builder.block();
        let no = builder.block();
        builder.append_to(entry);
        let a = builder.ins().const_int(IntValue::from_usize(8, 3));
        let b = builder.ins().const_int(IntValue::from_usize(8, 5));
        let c = builder.ins().slt(a, b);
        builder.ins().br_cond(c, yes, no);
        builder.append_to(yes);
        builder.ins().ret_value(a);
        builder.append_to(no);
        builder.ins().ret_value(b);

        let ctx = PassContext::new(&NoRanges);
        assert!(RangeDeadCodeElim::run_on_function(&ctx, &mut builder));
        assert!(!func.contains_block(no));
        assert_eq!(func.successors(entry), &[yes]);
        func.verify();
    }

    #[test]
    fn run_on_module_processes_all_functions() {
        let mut module = Module::new();
        let f = diamond(false);
        let mut ranges = x_in(&f, 10, 20);
        let mut g = diamond(false);
        g.name = "g".to_string();
        ranges.insert("g", g.arg_value(0), Range::signed(32, 0, 100));
        let f = module.add_function(f);
        let g = module.add_function(g);

        let ctx = PassContext::new(&ranges);
        assert!(RangeDeadCodeElim::run_on_module(&ctx, &mut module));
        assert_eq!(module[f].blocks().count(), 2);
        assert_eq!(module[g].blocks().count(), 3);
        module.verify();
        assert!(!RangeDeadCodeElim::run_on_module(&ctx, &mut module));
    }
}
