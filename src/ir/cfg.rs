// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of the control flow in a `Function`.
//!
//! Each `Function` has an associated `ControlFlowGraph` which contains the
//! basic blocks and the per-block information that is independent of the
//! instructions inside them.

use crate::{impl_table_indexing, ir::Block, table::PrimaryTable};
use bitflags::bitflags;

bitflags! {
    /// A set of flags attached to a basic block.
    pub struct BlockFlags: u8 {
        /// The identity of the block is observed outside of regular control
        /// flow, for example by storing its address in a jump table. Such a
        /// block must never be removed.
        const ADDRESS_TAKEN = 0b1;
    }
}

impl Default for BlockFlags {
    fn default() -> Self {
        BlockFlags::empty()
    }
}

/// Internal table storage for blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    /// The name of the block.
    pub name: Option<String>,
    /// Additional properties of the block.
    pub flags: BlockFlags,
}

/// A control flow graph.
///
/// This is the main container for BBs and control flow related information.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    /// The basic blocks in the graph.
    pub(crate) blocks: PrimaryTable<Block, BlockData>,
}

impl_table_indexing!(ControlFlowGraph, blocks, Block, BlockData);

impl ControlFlowGraph {
    /// Create a new control flow graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a BB to the graph.
    pub(super) fn add_block(&mut self) -> Block {
        self.blocks.add(BlockData::default())
    }

    /// Remove a BB from the graph.
    pub(super) fn remove_block(&mut self, bb: Block) {
        self.blocks.remove(bb);
    }

    /// Check whether a BB is still part of the graph.
    pub fn contains(&self, bb: Block) -> bool {
        self.blocks.contains(bb)
    }

    /// Return the name of a BB.
    pub fn get_name(&self, bb: Block) -> Option<&str> {
        self[bb].name.as_ref().map(AsRef::as_ref)
    }

    /// Set the name of a BB.
    pub(super) fn set_name(&mut self, bb: Block, name: String) {
        self[bb].name = Some(name);
    }

    /// Check whether the address of a BB is taken.
    pub fn is_address_taken(&self, bb: Block) -> bool {
        self[bb].flags.contains(BlockFlags::ADDRESS_TAKEN)
    }

    /// Mark the address of a BB as taken.
    pub(super) fn set_address_taken(&mut self, bb: Block) {
        self[bb].flags.insert(BlockFlags::ADDRESS_TAKEN);
    }
}
