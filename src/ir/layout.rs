// Copyright (c) 2017-2021 Fabian Schuiki

//! Instruction and BB ordering.

use crate::{
    ir::{Block, Inst},
    table::SecondaryTable,
};
use std::collections::HashMap;

/// Determines the order of instructions and BBs in a `Function`.
#[derive(Debug, Clone, Default)]
pub struct FunctionLayout {
    /// A linked list of BBs in layout order.
    bbs: SecondaryTable<Block, BlockNode>,
    /// The first BB in the layout.
    first_bb: Option<Block>,
    /// The last BB in the layout.
    last_bb: Option<Block>,
    /// Lookup table to find the BB that contains an instruction.
    inst_map: HashMap<Inst, Block>,
}

/// A node in the layout's double-linked list of BBs.
#[derive(Debug, Clone, Default)]
struct BlockNode {
    prev: Option<Block>,
    next: Option<Block>,
    layout: InstLayout,
}

impl FunctionLayout {
    /// Create a new function layout.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a mapping from an instruction to the block that contains it.
    fn map_inst(&mut self, inst: Inst, bb: Block) {
        if let Some(old_bb) = self.inst_map.insert(inst, bb) {
            panic!(
                "inst {} already inserted in {}, now being inserted into {}",
                inst, old_bb, bb
            );
        }
    }

    /// Remove a mapping from an instruction to the block that contains it.
    fn unmap_inst(&mut self, inst: Inst) -> Block {
        match self.inst_map.remove(&inst) {
            Some(bb) => bb,
            None => panic!("inst {} was not inserted", inst),
        }
    }
}

/// Basic block arrangement.
///
/// The following functions are used for laying out the basic blocks within a
/// `Function`.
impl FunctionLayout {
    /// Append a BB to the end of the function.
    pub fn append_block(&mut self, bb: Block) {
        self.bbs.add(
            bb,
            BlockNode {
                prev: self.last_bb,
                next: None,
                layout: Default::default(),
            },
        );
        if let Some(prev) = self.last_bb {
            self.bbs[prev].next = Some(bb);
        }
        if self.first_bb.is_none() {
            self.first_bb = Some(bb);
        }
        self.last_bb = Some(bb);
    }

    /// Remove a BB from the function.
    ///
    /// The BB must not contain any instructions anymore.
    pub fn remove_block(&mut self, bb: Block) {
        let node = self.bbs.remove(bb).expect("block not in layout");
        assert!(
            node.layout.first_inst.is_none(),
            "block {} removed from layout while still holding instructions",
            bb
        );
        if let Some(next) = node.next {
            self.bbs[next].prev = node.prev;
        }
        if let Some(prev) = node.prev {
            self.bbs[prev].next = node.next;
        }
        if self.first_bb == Some(bb) {
            self.first_bb = node.next;
        }
        if self.last_bb == Some(bb) {
            self.last_bb = node.prev;
        }
    }

    /// Return an iterator over all BBs in layout order.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        std::iter::successors(self.first_bb, move |&bb| self.next_block(bb))
    }

    /// Check whether a BB is part of the layout.
    pub fn is_block_inserted(&self, bb: Block) -> bool {
        self.bbs.contains(bb)
    }

    /// Get the first BB in the layout. This is the entry block.
    pub fn first_block(&self) -> Option<Block> {
        self.first_bb
    }

    /// Get the BB following `bb` in the layout.
    pub fn next_block(&self, bb: Block) -> Option<Block> {
        self.bbs[bb].next
    }

    /// Get the entry block in the layout.
    ///
    /// The fallible alternative is `first_block()`.
    pub fn entry(&self) -> Block {
        self.first_block().expect("entry block is required")
    }
}

/// Instruction arrangement.
///
/// The following functions are used for laying out the instructions within a
/// `Function`.
impl FunctionLayout {
    /// Append an instruction to the end of a BB.
    pub fn append_inst(&mut self, inst: Inst, bb: Block) {
        self.bbs[bb].layout.append_inst(inst);
        self.map_inst(inst, bb);
    }

    /// Insert an instruction before another instruction.
    pub fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        let bb = self.inst_block(before).expect("`before` not inserted");
        self.bbs[bb].layout.insert_inst_before(inst, before);
        self.map_inst(inst, bb);
    }

    /// Remove an instruction from the function.
    pub fn remove_inst(&mut self, inst: Inst) {
        let bb = self.unmap_inst(inst);
        self.bbs[bb].layout.remove_inst(inst);
    }

    /// Return an iterator over all instructions in a block in layout order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        self.bbs[bb].layout.insts()
    }

    /// Return an iterator over all instructions in the function in layout
    /// order.
    pub fn all_insts<'a>(&'a self) -> impl Iterator<Item = Inst> + 'a {
        self.blocks().flat_map(move |bb| self.insts(bb))
    }

    /// Get the first instruction in a block.
    pub fn first_inst(&self, bb: Block) -> Option<Inst> {
        self.bbs[bb].layout.first_inst
    }

    /// Get the last instruction in a block.
    pub fn last_inst(&self, bb: Block) -> Option<Inst> {
        self.bbs[bb].layout.last_inst
    }

    /// Get the block which contains `inst`.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_map.get(&inst).cloned()
    }

    /// Get the terminator instruction of a block.
    ///
    /// Panics if the block is empty.
    pub fn terminator(&self, bb: Block) -> Inst {
        match self.last_inst(bb) {
            Some(term) => term,
            None => panic!("block {} has no terminator", bb),
        }
    }
}

/// Determines the order of instructions within a block.
#[derive(Debug, Clone, Default)]
struct InstLayout {
    /// A linked list of instructions in layout order.
    insts: SecondaryTable<Inst, InstNode>,
    /// The first instruction in the layout.
    first_inst: Option<Inst>,
    /// The last instruction in the layout.
    last_inst: Option<Inst>,
}

/// A node in the layout's double-linked list of instructions.
#[derive(Debug, Clone, Default)]
struct InstNode {
    prev: Option<Inst>,
    next: Option<Inst>,
}

impl InstLayout {
    /// Append an instruction to the end of the block.
    fn append_inst(&mut self, inst: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: self.last_inst,
                next: None,
            },
        );
        if let Some(prev) = self.last_inst {
            self.insts[prev].next = Some(inst);
        }
        if self.first_inst.is_none() {
            self.first_inst = Some(inst);
        }
        self.last_inst = Some(inst);
    }

    /// Insert an instruction before another instruction.
    fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        self.insts.add(
            inst,
            InstNode {
                prev: self.insts[before].prev,
                next: Some(before),
            },
        );
        if let Some(prev) = self.insts[before].prev {
            self.insts[prev].next = Some(inst);
        }
        self.insts[before].prev = Some(inst);
        if self.first_inst == Some(before) {
            self.first_inst = Some(inst);
        }
    }

    /// Remove an instruction from the block.
    fn remove_inst(&mut self, inst: Inst) {
        let node = self.insts.remove(inst).expect("inst not in block layout");
        if let Some(next) = node.next {
            self.insts[next].prev = node.prev;
        }
        if let Some(prev) = node.prev {
            self.insts[prev].next = node.next;
        }
        if self.first_inst == Some(inst) {
            self.first_inst = node.next;
        }
        if self.last_inst == Some(inst) {
            self.last_inst = node.prev;
        }
    }

    /// Return an iterator over all instructions in layout order.
    fn insts<'a>(&'a self) -> impl Iterator<Item = Inst> + 'a {
        std::iter::successors(self.first_inst, move |&inst| self.next_inst(inst))
    }

    /// Get the instruction following `inst` in the layout.
    fn next_inst(&self, inst: Inst) -> Option<Inst> {
        self.insts[inst].next
    }
}
