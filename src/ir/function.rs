// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of functions.

use crate::{
    analysis::PredecessorTable,
    ir::{
        Block, ControlFlowGraph, DataFlowGraph, FunctionLayout, Inst, InstBuilder, InstData,
        Signature, Value,
    },
    ty::Type,
    verifier::Verifier,
};
use std::ops::{Deref, DerefMut};

/// A function.
///
/// Owns the data flow graph, control flow graph, and layout of its body. The
/// first block in the layout is the entry block.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub sig: Signature,
    pub dfg: DataFlowGraph,
    pub cfg: ControlFlowGraph,
    pub layout: FunctionLayout,
}

impl Function {
    /// Create a new function.
    pub fn new(name: impl Into<String>, sig: Signature) -> Self {
        let mut func = Self {
            name: name.into(),
            sig,
            dfg: DataFlowGraph::new(),
            cfg: ControlFlowGraph::new(),
            layout: FunctionLayout::new(),
        };
        func.dfg.make_args_for_signature(&func.sig);
        func
    }

    /// Return the name of the function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the entry block of the function.
    pub fn entry(&self) -> Block {
        self.layout.entry()
    }

    /// Return an iterator over the blocks of the function in layout order.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        self.layout.blocks()
    }

    /// Return an iterator over the instructions in a block.
    pub fn insts<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        self.layout.insts(bb)
    }

    /// Return an iterator over all instructions of the function in layout
    /// order.
    pub fn all_insts<'a>(&'a self) -> impl Iterator<Item = Inst> + 'a {
        self.layout.all_insts()
    }

    /// Return the terminator of a block.
    pub fn terminator(&self, bb: Block) -> Inst {
        self.layout.terminator(bb)
    }

    /// Return the control flow successors of a block, in terminator order.
    ///
    /// Blocks which are reached through multiple edges appear multiple times.
    pub fn successors(&self, bb: Block) -> &[Block] {
        match self.layout.last_inst(bb) {
            Some(term) => self.dfg[term].successors(),
            None => &[],
        }
    }

    /// Return the phi instructions at the beginning of a block.
    pub fn phis<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        self.insts(bb)
            .filter(move |&inst| self.dfg[inst].opcode().is_phi())
    }

    /// Check whether a block is still part of the function.
    pub fn contains_block(&self, bb: Block) -> bool {
        self.cfg.contains(bb) && self.layout.is_block_inserted(bb)
    }

    /// Check whether the address of a block is taken.
    pub fn is_address_taken(&self, bb: Block) -> bool {
        self.cfg.is_address_taken(bb)
    }

    /// Return the value of the argument at position `index`.
    pub fn arg_value(&self, index: usize) -> Value {
        let arg = self
            .sig
            .args()
            .nth(index)
            .unwrap_or_else(|| panic!("{} has no argument {}", self.name, index));
        self.dfg.arg_value(arg)
    }

    /// Compute the predecessor table of the function.
    pub fn predtbl(&self) -> PredecessorTable {
        PredecessorTable::new(self)
    }

    /// Dump the function in human-readable form.
    pub fn dump(&self) -> FunctionDumper {
        FunctionDumper(self)
    }

    /// Verify the integrity of the function.
    ///
    /// Panics with a dump of the function if verification fails.
    pub fn verify(&self) {
        let mut verifier = Verifier::new();
        verifier.verify_function(self);
        match verifier.finish() {
            Ok(()) => (),
            Err(errs) => {
                eprintln!("");
                eprintln!("Verified function:");
                eprintln!("{}", self.dump());
                eprintln!("");
                eprintln!("Verification errors:");
                eprintln!("{}", errs);
                panic!("verification failed");
            }
        }
    }
}

/// Temporary object to dump a `Function` in human-readable form.
pub struct FunctionDumper<'a>(&'a Function);

impl std::fmt::Display for FunctionDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let func = self.0;
        write!(f, "func @{} (", func.name)?;
        let mut comma = false;
        for arg in func.sig.args() {
            if comma {
                write!(f, ", ")?;
            }
            let value = func.dfg.arg_value(arg);
            write!(f, "{} {}", func.sig.arg_type(arg), value.dump(func))?;
            comma = true;
        }
        writeln!(f, ") {} {{", func.sig.return_type())?;
        for bb in func.blocks() {
            write!(f, "{}:", bb.dump(func))?;
            if func.is_address_taken(bb) {
                write!(f, " !addrtaken")?;
            }
            writeln!(f)?;
            for inst in func.insts(bb) {
                writeln!(f, "    {}", inst.dump(func))?;
            }
        }
        write!(f, "}}")?;
        Ok(())
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.dump())
    }
}

impl Block {
    /// Dump the block in human readable form.
    pub fn dump(self, func: &Function) -> BlockDumper {
        BlockDumper(self, func)
    }
}

/// Temporary object to dump a `Block` in human-readable form for debugging.
pub struct BlockDumper<'a>(Block, &'a Function);

impl std::fmt::Display for BlockDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let cfg = &self.1.cfg;
        match cfg.blocks.get(self.0).and_then(|data| data.name.as_ref()) {
            Some(name) => write!(f, "%{}", name),
            None => write!(f, "%{}", self.0),
        }
    }
}

/// An insertion point for new instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertPos {
    None,
    Append(Block),
    Before(Inst),
}

/// Temporary object used to build or mutate a single `Function`.
///
/// Dereferences to the function for read access.
pub struct FunctionBuilder<'u> {
    /// The function currently being built.
    func: &'u mut Function,
    /// The position where we are currently inserting instructions.
    pos: InsertPos,
}

impl<'u> FunctionBuilder<'u> {
    /// Create a new function builder.
    pub fn new(func: &'u mut Function) -> Self {
        Self {
            func,
            pos: InsertPos::None,
        }
    }

    /// Return the function being built.
    pub fn func(&self) -> &Function {
        self.func
    }

    /// Return the function being built, mutably.
    pub fn func_mut(&mut self) -> &mut Function {
        self.func
    }

    /// Add a new instruction using an `InstBuilder`.
    pub fn ins<'b>(&'b mut self) -> InstBuilder<'u, 'b> {
        InstBuilder::new(self)
    }

    /// Add a new instruction at the current insertion position.
    pub(crate) fn build_inst(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.func.dfg.add_inst(data, ty);
        match self.pos {
            InsertPos::None => panic!("no block selected to insert instruction"),
            InsertPos::Append(bb) => self.func.layout.append_inst(inst, bb),
            InsertPos::Before(other) => self.func.layout.insert_inst_before(inst, other),
        }
        inst
    }

    /// Remove an instruction.
    ///
    /// The result of the instruction must no longer be used.
    pub fn remove_inst(&mut self, inst: Inst) {
        if let InsertPos::Before(other) = self.pos {
            if other == inst {
                self.pos = InsertPos::None;
            }
        }
        self.func.layout.remove_inst(inst);
        self.func.dfg.remove_inst(inst);
    }

    /// Create a new BB at the end of the function.
    pub fn block(&mut self) -> Block {
        let bb = self.func.cfg.add_block();
        self.func.layout.append_block(bb);
        bb
    }

    /// Create a new named BB at the end of the function.
    pub fn named_block(&mut self, name: impl Into<String>) -> Block {
        let bb = self.block();
        self.func.cfg.set_name(bb, name.into());
        bb
    }

    /// Remove a BB and all of its instructions.
    ///
    /// Results of the removed instructions that are still used elsewhere are
    /// replaced with `undef`. Phi entries and branches referring to the BB
    /// must have been rewired by the caller.
    pub fn remove_block(&mut self, bb: Block) {
        let insts: Vec<_> = self.func.layout.insts(bb).collect();
        for &inst in &insts {
            if let Some(value) = self.func.dfg.get_inst_result(inst) {
                if self.func.dfg.has_uses(value) {
                    let undef = self.func.dfg.add_undef(self.func.dfg.value_type(value));
                    self.func.dfg.replace_use(value, undef);
                }
            }
        }
        for inst in insts {
            self.remove_inst(inst);
        }
        if let InsertPos::Append(other) = self.pos {
            if other == bb {
                self.pos = InsertPos::None;
            }
        }
        self.func.layout.remove_block(bb);
        self.func.cfg.remove_block(bb);
    }

    /// Mark the address of a BB as taken.
    pub fn set_address_taken(&mut self, bb: Block) {
        self.func.cfg.set_address_taken(bb);
    }

    /// Replace all uses of a value with another.
    pub fn replace_use(&mut self, from: Value, to: Value) -> usize {
        self.func.dfg.replace_use(from, to)
    }

    /// Replace the uses of a block with another within one instruction.
    pub fn replace_block_within_inst(&mut self, from: Block, to: Block, inst: Inst) -> usize {
        self.func.dfg.replace_block_within_inst(from, to, inst)
    }

    /// Remove one incoming edge from `pred` in every phi node of `bb`.
    ///
    /// This keeps the phi nodes consistent after a single control flow edge
    /// from `pred` to `bb` has been removed. Returns the number of phi nodes
    /// that were updated.
    pub fn remove_phi_incoming(&mut self, bb: Block, pred: Block) -> usize {
        let phis: Vec<_> = self.func.phis(bb).collect();
        let mut count = 0;
        for phi in phis {
            if self.func.dfg.remove_phi_incoming(phi, pred).is_some() {
                count += 1;
            }
        }
        count
    }

    /// Append new instructions at the end of a block.
    pub fn append_to(&mut self, bb: Block) {
        self.pos = InsertPos::Append(bb);
    }

    /// Insert new instructions before an instruction.
    pub fn insert_before(&mut self, inst: Inst) {
        self.pos = InsertPos::Before(inst);
    }
}

impl Deref for FunctionBuilder<'_> {
    type Target = Function;

    fn deref(&self) -> &Function {
        self.func
    }
}

impl DerefMut for FunctionBuilder<'_> {
    fn deref_mut(&mut self) -> &mut Function {
        self.func
    }
}
