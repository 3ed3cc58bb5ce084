// Copyright (c) 2017-2021 Fabian Schuiki

//! Removal of blocks that lost their last incoming edge.

use super::resolve::DeadCandidates;
use crate::analysis::Reachability;
use crate::ir::prelude::*;
use std::collections::HashSet;

/// Remove the dead candidates that are no longer reachable.
///
/// Candidates are kept if they are the entry block, have already been
/// removed, have their address taken, or can still be reached from the entry
/// block. Every remaining candidate is unlinked from the control flow graph
/// and deleted together with its instructions.
///
/// Returns the number of removed blocks.
pub fn prune_dead_blocks(func: &mut FunctionBuilder, candidates: DeadCandidates) -> usize {
    let candidates: Vec<Block> = candidates.into_iter().collect();
    if candidates.is_empty() {
        return 0;
    }

    let entry = func.entry();
    let reachable = Reachability::new(func.func());
    let dead: Vec<Block> = candidates
        .into_iter()
        .filter(|&bb| {
            if bb == entry || !func.contains_block(bb) {
                false
            } else if func.is_address_taken(bb) {
                debug!(
                    "Keeping {} since its address is taken",
                    bb.dump(func.func())
                );
                false
            } else if reachable.is_reachable(bb) {
                debug!("Keeping {} since it is still reachable", bb.dump(func.func()));
                false
            } else {
                true
            }
        })
        .collect();
    let dead_set: HashSet<Block> = dead.iter().cloned().collect();
    let pt = func.predtbl();

    for &bb in &dead {
        // Other blocks branching here are unreachable themselves. Point them
        // at the entry block, which never carries phi nodes.
        for pred in pt.pred_set(bb) {
            if dead_set.contains(&pred) {
                continue;
            }
            let term = func.terminator(pred);
            debug!(
                "Redirecting {} from {} to {}",
                term.dump(func.func()),
                bb.dump(func.func()),
                entry.dump(func.func())
            );
            func.replace_block_within_inst(bb, entry, term);
        }

        // Drop the incoming edges from this block.
        for succ in pt.succ(bb) {
            if succ != bb && func.contains_block(succ) {
                func.remove_phi_incoming(succ, bb);
            }
        }

        debug!("Removing {}", bb.dump(func.func()));
        func.remove_block(bb);
    }

    dead.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::int_ty;
    use crate::value::IntValue;

    struct Blocks {
        entry: Block,
        a: Block,
        b: Block,
        exit: Block,
    }

    /// Build a function where `%entry` jumps to `%exit`, and the orphaned
    /// `%a` flows through `%b` into `%exit`.
    fn orphans(func: &mut Function) -> Blocks {
        let mut builder = FunctionBuilder::new(func);
        let entry = builder.named_block("entry");
        let a = builder.named_block("a");
        let b = builder.named_block("b");
        let exit = builder.named_block("exit");
        builder.append_to(entry);
        let k0 = builder.ins().const_int(IntValue::from_usize(16, 0));
        builder.ins().br(exit);
        builder.append_to(a);
        let k1 = builder.ins().const_int(IntValue::from_usize(16, 1));
        builder.ins().br(b);
        builder.append_to(b);
        let k2 = builder.ins().add(k1, k1);
        builder.ins().br(exit);
        builder.append_to(exit);
        let r = builder.ins().phi(vec![k0, k2], vec![entry, b]);
        builder.ins().ret_value(r);
        Blocks { entry, a, b, exit }
    }

    fn new_func() -> Function {
        let mut sig = Signature::new();
        sig.set_return_type(int_ty(16));
        Function::new("h", sig)
    }

    #[test]
    fn remove_unreachable_chain() {
        let mut func = new_func();
        let bbs = orphans(&mut func);
        let candidates = vec![bbs.a, bbs.b].into_iter().collect();
        let removed = prune_dead_blocks(&mut FunctionBuilder::new(&mut func), candidates);
        assert_eq!(removed, 2);
        assert_eq!(func.blocks().collect::<Vec<_>>(), vec![bbs.entry, bbs.exit]);
        let phi = func.phis(bbs.exit).next().unwrap();
        assert_eq!(func.dfg[phi].blocks(), &[bbs.entry]);
        func.verify();
    }

    #[test]
    fn redirect_unreachable_predecessor_to_entry() {
        let mut func = new_func();
        let bbs = orphans(&mut func);
        // Only %b is a candidate; its orphaned predecessor %a stays behind.
        let candidates = vec![bbs.b].into_iter().collect();
        let removed = prune_dead_blocks(&mut FunctionBuilder::new(&mut func), candidates);
        assert_eq!(removed, 1);
        assert!(func.contains_block(bbs.a));
        assert_eq!(func.successors(bbs.a), &[bbs.entry]);
        func.verify();
    }

    #[test]
    fn keep_address_taken_block() {
        let mut func = new_func();
        let bbs = orphans(&mut func);
        FunctionBuilder::new(&mut func).set_address_taken(bbs.b);
        let candidates = vec![bbs.a, bbs.b].into_iter().collect();
        let removed = prune_dead_blocks(&mut FunctionBuilder::new(&mut func), candidates);
        assert_eq!(removed, 1);
        assert!(!func.contains_block(bbs.a));
        assert!(func.contains_block(bbs.b));
        // %b used a value defined in %a, which is now undefined.
        let add = func.insts(bbs.b).next().unwrap();
        let arg = func.dfg[add].args()[0];
        assert!(func.dfg[arg].is_undef());
        assert_eq!(func.successors(bbs.b), &[bbs.exit]);
        func.verify();
    }

    #[test]
    fn kept_block_branching_into_removed_block_is_redirected() {
        let mut func = new_func();
        let bbs = orphans(&mut func);
        FunctionBuilder::new(&mut func).set_address_taken(bbs.a);
        let candidates = vec![bbs.a, bbs.b].into_iter().collect();
        let removed = prune_dead_blocks(&mut FunctionBuilder::new(&mut func), candidates);
        assert_eq!(removed, 1);
        assert!(func.contains_block(bbs.a));
        assert!(!func.contains_block(bbs.b));
        assert_eq!(func.successors(bbs.a), &[bbs.entry]);
        let phi = func.phis(bbs.exit).next().unwrap();
        assert_eq!(func.dfg[phi].blocks(), &[bbs.entry]);
        func.verify();
    }

    #[test]
    fn keep_reachable_entry_and_removed_blocks() {
        let mut func = new_func();
        let bbs = orphans(&mut func);
        let candidates = vec![bbs.entry, bbs.exit].into_iter().collect();
        let removed = prune_dead_blocks(&mut FunctionBuilder::new(&mut func), candidates);
        assert_eq!(removed, 0);

        let removed = prune_dead_blocks(
            &mut FunctionBuilder::new(&mut func),
            vec![bbs.a].into_iter().collect(),
        );
        assert_eq!(removed, 1);
        let removed = prune_dead_blocks(
            &mut FunctionBuilder::new(&mut func),
            vec![bbs.a].into_iter().collect(),
        );
        assert_eq!(removed, 0);
        assert_eq!(func.blocks().count(), 3);
    }
}
