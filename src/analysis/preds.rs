// Copyright (c) 2017-2021 Fabian Schuiki

use crate::{
    ir::{Block, Function},
    table::TableKey,
};
use hibitset::BitSet;
use std::collections::{HashMap, HashSet};

/// A table of basic block predecessors.
///
/// Edges are recorded with multiplicity: a conditional branch whose two
/// targets are the same block contributes two edges to that block. This
/// matches the number of incoming entries a phi node in the target needs.
#[derive(Debug, Clone)]
pub struct PredecessorTable {
    pred: HashMap<Block, Vec<Block>>,
    succ: HashMap<Block, Vec<Block>>,
}

impl PredecessorTable {
    /// Compute the predecessor table for a function.
    ///
    /// Panics if a terminator refers to a block that is not part of the
    /// function.
    pub fn new(func: &Function) -> Self {
        let mut pred = HashMap::new();
        let mut succ = HashMap::new();
        for bb in func.blocks() {
            pred.insert(bb, Vec::new());
        }
        for bb in func.blocks() {
            let targets = func.successors(bb).to_vec();
            for &to_bb in &targets {
                match pred.get_mut(&to_bb) {
                    Some(preds) => preds.push(bb),
                    None => panic!(
                        "{} in {} branches to {}, which is not part of the function",
                        bb, func.name, to_bb
                    ),
                }
            }
            succ.insert(bb, targets);
        }
        Self { pred, succ }
    }

    /// Get the predecessor edges of a block.
    pub fn pred_edges(&self, bb: Block) -> &[Block] {
        &self.pred[&bb]
    }

    /// Get the distinct predecessors of a block.
    pub fn pred_set(&self, bb: Block) -> HashSet<Block> {
        self.pred(bb).collect()
    }

    /// Get the predecessors of a block, one per edge.
    pub fn pred(&self, bb: Block) -> impl Iterator<Item = Block> + Clone + '_ {
        self.pred[&bb].iter().cloned()
    }

    /// Get the successors of a block, one per edge.
    pub fn succ(&self, bb: Block) -> impl Iterator<Item = Block> + Clone + '_ {
        self.succ[&bb].iter().cloned()
    }
}

/// The set of blocks reachable from the entry of a function.
#[derive(Debug, Clone)]
pub struct Reachability {
    reached: BitSet,
}

impl Reachability {
    /// Compute which blocks can be reached from the entry block by following
    /// successor edges.
    pub fn new(func: &Function) -> Self {
        let mut reached = BitSet::with_capacity(func.cfg.blocks.capacity() as u32);
        let mut todo = vec![func.entry()];
        while let Some(bb) = todo.pop() {
            if reached.add(bb.index() as u32) {
                continue;
            }
            todo.extend(func.successors(bb).iter().cloned());
        }
        Self { reached }
    }

    /// Check whether a block is reachable.
    pub fn is_reachable(&self, bb: Block) -> bool {
        self.reached.contains(bb.index() as u32)
    }
}
