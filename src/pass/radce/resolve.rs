// Copyright (c) 2017-2021 Fabian Schuiki

//! Comparison folding and branch resolution.

use super::eval::evaluate;
use crate::analysis::{range_of, RangeQuery};
use crate::ir::prelude::*;
use std::collections::{HashMap, HashSet};

/// The comparisons folded into constants by `fold_comparisons`.
///
/// Maps the constant that replaced each comparison to its outcome.
#[derive(Debug, Clone, Default)]
pub struct FoldedComparisons {
    consts: HashMap<Value, bool>,
}

impl FoldedComparisons {
    /// Return the outcome a constant was folded to, if it replaced a
    /// comparison.
    pub fn get(&self, value: Value) -> Option<bool> {
        self.consts.get(&value).cloned()
    }

    /// Return the number of folded comparisons.
    pub fn len(&self) -> usize {
        self.consts.len()
    }

    /// Check whether no comparison was folded.
    pub fn is_empty(&self) -> bool {
        self.consts.is_empty()
    }

    /// Iterate over the folded constants and their outcome.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = (Value, bool)> + 'a {
        self.consts.iter().map(|(&v, &b)| (v, b))
    }
}

/// Blocks that lost an incoming edge while resolving branches.
///
/// Keeps the order in which blocks were first recorded and holds each block
/// at most once.
#[derive(Debug, Clone, Default)]
pub struct DeadCandidates {
    order: Vec<Block>,
    seen: HashSet<Block>,
}

impl DeadCandidates {
    /// Create an empty candidate set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Record a block. Returns `false` if it was already recorded.
    pub fn insert(&mut self, bb: Block) -> bool {
        if self.seen.insert(bb) {
            self.order.push(bb);
            true
        } else {
            false
        }
    }

    /// Check whether a block has been recorded.
    pub fn contains(&self, bb: Block) -> bool {
        self.seen.contains(&bb)
    }

    /// Return the number of recorded blocks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check whether no block has been recorded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over the recorded blocks in insertion order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        self.order.iter().cloned()
    }
}

impl IntoIterator for DeadCandidates {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

impl std::iter::FromIterator<Block> for DeadCandidates {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        let mut set = Self::new();
        for bb in iter {
            set.insert(bb);
        }
        set
    }
}

/// The outcome of `resolve_branches`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedBranches {
    /// The number of conditional branches replaced by unconditional ones.
    pub count: usize,
    /// The targets that lost their incoming edge.
    pub candidates: DeadCandidates,
}

/// Replace comparisons whose outcome is decided by value ranges with
/// constants.
///
/// The constant is inserted right before the comparison and takes over its
/// name and all its uses. The comparison itself is removed.
pub fn fold_comparisons(ranges: &dyn RangeQuery, func: &mut FunctionBuilder) -> FoldedComparisons {
    let mut folded = FoldedComparisons::default();
    let comparisons: Vec<Inst> = func
        .all_insts()
        .filter(|&inst| func.dfg[inst].opcode().is_comparison())
        .collect();

    for inst in comparisons {
        let data = &func.dfg[inst];
        let opcode = data.opcode();
        let (lhs, rhs) = (data.args()[0], data.args()[1]);
        let outcome = match (
            range_of(ranges, func.func(), lhs),
            range_of(ranges, func.func(), rhs),
        ) {
            (Some(r0), Some(r1)) => evaluate(opcode, &r0, &r1),
            _ => None,
        };
        let outcome = match outcome {
            Some(outcome) => outcome,
            None => continue,
        };
        debug!(
            "Folding {} to {}",
            inst.dump(func.func()),
            outcome as usize
        );

        let result = func.dfg.inst_result(inst);
        func.insert_before(inst);
        let konst = func.ins().const_bool(outcome);
        if let Some(name) = func.dfg.clear_name(result) {
            func.dfg.set_name(konst, name);
        }
        func.replace_use(result, konst);
        func.remove_inst(inst);
        folded.consts.insert(konst, outcome);
    }

    folded
}

/// Replace conditional branches on constants with unconditional ones.
///
/// The outcome of a condition is looked up in `folded` first, then in the
/// `const` instruction that defines it. The target that is no longer taken
/// loses one incoming edge. Its phi nodes drop the matching entry right away,
/// and the target is recorded as a dead candidate unless it is also the taken
/// target.
pub fn resolve_branches(
    func: &mut FunctionBuilder,
    folded: &FoldedComparisons,
) -> ResolvedBranches {
    let mut resolved = ResolvedBranches::default();
    let blocks: Vec<Block> = func.blocks().collect();

    for bb in blocks {
        let term = match func.layout.last_inst(bb) {
            Some(term) => term,
            None => continue,
        };
        let data = &func.dfg[term];
        if data.opcode() != Opcode::BrCond {
            continue;
        }
        let cond = data.args()[0];
        let (if_true, if_false) = (data.blocks()[0], data.blocks()[1]);
        let outcome = folded
            .get(cond)
            .or_else(|| func.dfg.get_const_int(cond).map(|imm| !imm.is_zero()));
        let (live, dead) = match outcome {
            Some(true) => (if_true, if_false),
            Some(false) => (if_false, if_true),
            None => continue,
        };
        debug!(
            "Replacing {} with br {}",
            term.dump(func.func()),
            live.dump(func.func())
        );

        func.insert_before(term);
        func.ins().br(live);
        func.remove_inst(term);
        func.remove_phi_incoming(dead, bb);
        if dead != live {
            resolved.candidates.insert(dead);
        }
        resolved.count += 1;
    }

    resolved
}
