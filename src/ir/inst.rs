// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of instructions.
//!
//! This module implements the various instructions of the intermediate
//! representation.

use crate::{
    ir::{Block, Function, FunctionBuilder, Inst, Value},
    ty::{addr_ty, int_ty, void_ty, Type},
    value::IntValue,
};

/// A temporary object used to construct a single instruction.
pub struct InstBuilder<'a, 'b> {
    builder: &'b mut FunctionBuilder<'a>,
    name: Option<String>,
}

impl<'a, 'b> InstBuilder<'a, 'b> {
    /// Create a new instruction builder that inserts into `builder`.
    pub fn new(builder: &'b mut FunctionBuilder<'a>) -> Self {
        Self {
            builder,
            name: None,
        }
    }

    /// Assign a name to the instruction being built.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<'a, 'b> InstBuilder<'a, 'b> {
    /// `a = const iN imm`
    pub fn const_int(&mut self, value: impl Into<IntValue>) -> Value {
        let value = value.into();
        let ty = value.ty();
        let data = InstData::ConstInt {
            opcode: Opcode::ConstInt,
            imm: value,
        };
        let inst = self.build(data, ty);
        self.inst_result(inst)
    }

    /// `a = const i1 imm`
    pub fn const_bool(&mut self, value: bool) -> Value {
        self.const_int(IntValue::from_bool(value))
    }

    /// `a = add iN x, y`
    pub fn add(&mut self, x: Value, y: Value) -> Value {
        let ty = self.value_type(x);
        let inst = self.build_binary(Opcode::Add, ty, x, y);
        self.inst_result(inst)
    }

    /// `a = sub iN x, y`
    pub fn sub(&mut self, x: Value, y: Value) -> Value {
        let ty = self.value_type(x);
        let inst = self.build_binary(Opcode::Sub, ty, x, y);
        self.inst_result(inst)
    }

    /// `a = eq iN x, y`
    pub fn eq(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Eq, x, y)
    }

    /// `a = neq iN x, y`
    pub fn neq(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Neq, x, y)
    }

    /// `a = slt iN x, y`
    pub fn slt(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Slt, x, y)
    }

    /// `a = sgt iN x, y`
    pub fn sgt(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Sgt, x, y)
    }

    /// `a = sle iN x, y`
    pub fn sle(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Sle, x, y)
    }

    /// `a = sge iN x, y`
    pub fn sge(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Sge, x, y)
    }

    /// `a = ult iN x, y`
    pub fn ult(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Ult, x, y)
    }

    /// `a = ugt iN x, y`
    pub fn ugt(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Ugt, x, y)
    }

    /// `a = ule iN x, y`
    pub fn ule(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Ule, x, y)
    }

    /// `a = uge iN x, y`
    pub fn uge(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Uge, x, y)
    }

    /// Build a comparison with an explicit opcode.
    ///
    /// Panics if `opcode` is not a comparison.
    pub fn compare(&mut self, opcode: Opcode, x: Value, y: Value) -> Value {
        assert!(opcode.is_comparison(), "{} is not a comparison", opcode);
        let inst = self.build_binary(opcode, int_ty(1), x, y);
        self.inst_result(inst)
    }

    /// `a = phi type [x, bb],*`
    pub fn phi(&mut self, args: Vec<Value>, bbs: Vec<Block>) -> Value {
        assert!(!args.is_empty(), "phi requires at least one incoming value");
        let ty = self.value_type(args[0]);
        self.phi_of(ty, args, bbs)
    }

    /// `a = phi type [x, bb],*` with an explicit type
    ///
    /// Allows phi nodes without incoming values, as they remain in blocks
    /// whose predecessors have all been removed.
    pub fn phi_of(&mut self, ty: Type, args: Vec<Value>, bbs: Vec<Block>) -> Value {
        assert_eq!(args.len(), bbs.len());
        let inst = self.build(
            InstData::Phi {
                opcode: Opcode::Phi,
                args,
                bbs,
            },
            ty,
        );
        self.inst_result(inst)
    }

    /// `a = blockaddr bb`
    ///
    /// Marks the address of `bb` as taken.
    pub fn block_addr(&mut self, bb: Block) -> Value {
        self.builder.set_address_taken(bb);
        let inst = self.build(
            InstData::Jump {
                opcode: Opcode::BlockAddr,
                bbs: [bb],
            },
            addr_ty(),
        );
        self.inst_result(inst)
    }

    /// `ret`
    pub fn ret(&mut self) -> Inst {
        self.build(InstData::Nullary { opcode: Opcode::Ret }, void_ty())
    }

    /// `ret type x`
    pub fn ret_value(&mut self, x: Value) -> Inst {
        self.build(
            InstData::Unary {
                opcode: Opcode::RetValue,
                args: [x],
            },
            void_ty(),
        )
    }

    /// `br bb`
    pub fn br(&mut self, bb: Block) -> Inst {
        self.build(
            InstData::Jump {
                opcode: Opcode::Br,
                bbs: [bb],
            },
            void_ty(),
        )
    }

    /// `br x, if_true, if_false`
    pub fn br_cond(&mut self, x: Value, if_true: Block, if_false: Block) -> Inst {
        self.build(
            InstData::Branch {
                opcode: Opcode::BrCond,
                args: [x],
                bbs: [if_true, if_false],
            },
            void_ty(),
        )
    }

    fn build_binary(&mut self, opcode: Opcode, ty: Type, x: Value, y: Value) -> Inst {
        let data = InstData::Binary {
            opcode,
            args: [x, y],
        };
        self.build(data, ty)
    }

    fn build(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.builder.build_inst(data, ty);
        if let Some(name) = self.name.take() {
            let value = self.builder.func().dfg.inst_result(inst);
            self.builder.func_mut().dfg.set_name(value, name);
        }
        inst
    }

    fn value_type(&self, value: Value) -> Type {
        self.builder.func().dfg.value_type(value)
    }

    fn inst_result(&self, inst: Inst) -> Value {
        self.builder.func().dfg.inst_result(inst)
    }
}

/// An instruction format.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstData {
    /// `a = const iN imm`
    ConstInt { opcode: Opcode, imm: IntValue },
    /// `opcode`
    Nullary { opcode: Opcode },
    /// `opcode type x`
    Unary { opcode: Opcode, args: [Value; 1] },
    /// `opcode type x, y`
    Binary { opcode: Opcode, args: [Value; 2] },
    /// `opcode bb`
    Jump { opcode: Opcode, bbs: [Block; 1] },
    /// `opcode type [x, bb],*`
    Phi {
        opcode: Opcode,
        args: Vec<Value>,
        bbs: Vec<Block>,
    },
    /// `opcode x, bb0, bb1`
    Branch {
        opcode: Opcode,
        args: [Value; 1],
        bbs: [Block; 2],
    },
}

impl InstData {
    /// Get the opcode of the instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            InstData::ConstInt { opcode, .. } => opcode,
            InstData::Nullary { opcode, .. } => opcode,
            InstData::Unary { opcode, .. } => opcode,
            InstData::Binary { opcode, .. } => opcode,
            InstData::Jump { opcode, .. } => opcode,
            InstData::Phi { opcode, .. } => opcode,
            InstData::Branch { opcode, .. } => opcode,
        }
    }

    /// Get the arguments of an instruction.
    pub fn args(&self) -> &[Value] {
        match self {
            InstData::ConstInt { .. } => &[],
            InstData::Nullary { .. } => &[],
            InstData::Unary { args, .. } => args,
            InstData::Binary { args, .. } => args,
            InstData::Jump { .. } => &[],
            InstData::Phi { args, .. } => args,
            InstData::Branch { args, .. } => args,
        }
    }

    /// Mutable access to the arguments of an instruction.
    pub(crate) fn args_mut(&mut self) -> &mut [Value] {
        match self {
            InstData::ConstInt { .. } => &mut [],
            InstData::Nullary { .. } => &mut [],
            InstData::Unary { args, .. } => args,
            InstData::Binary { args, .. } => args,
            InstData::Jump { .. } => &mut [],
            InstData::Phi { args, .. } => args,
            InstData::Branch { args, .. } => args,
        }
    }

    /// Get the BBs of an instruction.
    ///
    /// For conditional branches the first BB is the target taken if the
    /// condition is true, the second one if it is false.
    pub fn blocks(&self) -> &[Block] {
        match self {
            InstData::Jump { bbs, .. } => bbs,
            InstData::Phi { bbs, .. } => bbs,
            InstData::Branch { bbs, .. } => bbs,
            _ => &[],
        }
    }

    /// Mutable access to the BBs of an instruction.
    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        match self {
            InstData::Jump { bbs, .. } => bbs,
            InstData::Phi { bbs, .. } => bbs,
            InstData::Branch { bbs, .. } => bbs,
            _ => &mut [],
        }
    }

    /// Get the control flow successors of a terminator instruction.
    ///
    /// Returns an empty slice for all other instructions, including
    /// `blockaddr` which references a block without transferring control.
    pub fn successors(&self) -> &[Block] {
        if self.opcode().is_terminator() {
            self.blocks()
        } else {
            &[]
        }
    }

    /// Replace all uses of a value with another.
    pub(crate) fn replace_value(&mut self, from: Value, to: Value) -> usize {
        let mut count = 0;
        for arg in self.args_mut() {
            if *arg == from {
                *arg = to;
                count += 1;
            }
        }
        count
    }

    /// Replace all uses of a block with another.
    pub(crate) fn replace_block(&mut self, from: Block, to: Block) -> usize {
        let mut count = 0;
        for bb in self.blocks_mut() {
            if *bb == from {
                *bb = to;
                count += 1;
            }
        }
        count
    }

    /// Remove one incoming edge from `block` in a phi instruction.
    ///
    /// Removes the first matching entry and keeps the order of all others.
    /// Returns the incoming value that was removed, if any.
    pub(crate) fn remove_phi_incoming(&mut self, block: Block) -> Option<Value> {
        match self {
            InstData::Phi { bbs, args, .. } => {
                let index = bbs.iter().position(|&bb| bb == block)?;
                bbs.remove(index);
                Some(args.remove(index))
            }
            _ => None,
        }
    }

    /// Return the const int constructed by this instruction.
    pub fn get_const_int(&self) -> Option<&IntValue> {
        match self {
            InstData::ConstInt { imm, .. } => Some(imm),
            _ => None,
        }
    }
}

/// An instruction opcode.
///
/// This enum represents the actual instruction, whereas `InstData` covers the
/// format and arguments of the instruction.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Opcode {
    ConstInt,
    Add,
    Sub,

    Eq,
    Neq,
    Slt,
    Sgt,
    Sle,
    Sge,
    Ult,
    Ugt,
    Ule,
    Uge,

    Phi,
    BlockAddr,

    Ret,
    RetValue,
    Br,
    BrCond,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                Opcode::ConstInt => "const",
                Opcode::Add => "add",
                Opcode::Sub => "sub",
                Opcode::Eq => "eq",
                Opcode::Neq => "neq",
                Opcode::Slt => "slt",
                Opcode::Sgt => "sgt",
                Opcode::Sle => "sle",
                Opcode::Sge => "sge",
                Opcode::Ult => "ult",
                Opcode::Ugt => "ugt",
                Opcode::Ule => "ule",
                Opcode::Uge => "uge",
                Opcode::Phi => "phi",
                Opcode::BlockAddr => "blockaddr",
                Opcode::Ret => "ret",
                Opcode::RetValue => "ret",
                Opcode::Br => "br",
                Opcode::BrCond => "br",
            }
        )
    }
}

impl Opcode {
    /// Look up the comparison opcode with the given mnemonic.
    pub fn comparison_from_str(s: &str) -> Option<Opcode> {
        Some(match s {
            "eq" => Opcode::Eq,
            "neq" => Opcode::Neq,
            "slt" => Opcode::Slt,
            "sgt" => Opcode::Sgt,
            "sle" => Opcode::Sle,
            "sge" => Opcode::Sge,
            "ult" => Opcode::Ult,
            "ugt" => Opcode::Ugt,
            "ule" => Opcode::Ule,
            "uge" => Opcode::Uge,
            _ => return None,
        })
    }

    /// Check if this instruction is a comparison.
    pub fn is_comparison(self) -> bool {
        match self {
            Opcode::Eq
            | Opcode::Neq
            | Opcode::Slt
            | Opcode::Sgt
            | Opcode::Sle
            | Opcode::Sge
            | Opcode::Ult
            | Opcode::Ugt
            | Opcode::Ule
            | Opcode::Uge => true,
            _ => false,
        }
    }

    /// Check if this instruction is a phi node.
    pub fn is_phi(self) -> bool {
        match self {
            Opcode::Phi => true,
            _ => false,
        }
    }

    /// Check if this instruction is a terminator.
    pub fn is_terminator(self) -> bool {
        match self {
            Opcode::Ret | Opcode::RetValue | Opcode::Br | Opcode::BrCond => true,
            _ => false,
        }
    }

    /// Check if this is a return instruction.
    pub fn is_return(self) -> bool {
        match self {
            Opcode::Ret | Opcode::RetValue => true,
            _ => false,
        }
    }
}

impl Inst {
    /// Dump the instruction in human readable form.
    pub fn dump(self, func: &Function) -> InstDumper {
        InstDumper(self, func)
    }
}

/// Temporary object to dump an `Inst` in human-readable form for debugging.
///
/// Comparisons print the type of their operands; all other instructions that
/// yield a value print the type of their result.
pub struct InstDumper<'a>(Inst, &'a Function);

impl std::fmt::Display for InstDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inst = self.0;
        let func = self.1;
        let dfg = &func.dfg;
        let data = &dfg[inst];
        let opcode = data.opcode();
        if dfg.has_result(inst) {
            write!(f, "{} = {}", dfg.inst_result(inst).dump(func), opcode)?;
        } else {
            write!(f, "{}", opcode)?;
        }
        match data {
            InstData::ConstInt { imm, .. } => write!(f, " {}", imm)?,
            InstData::Phi { args, bbs, .. } => {
                write!(f, " {}", dfg.inst_type(inst))?;
                let mut comma = false;
                for (arg, bb) in args.iter().zip(bbs.iter()) {
                    if comma {
                        write!(f, ",")?;
                    }
                    write!(f, " [{}, {}]", arg.dump(func), bb.dump(func))?;
                    comma = true;
                }
            }
            _ => {
                if let Some(&first) = data.args().first() {
                    if opcode != Opcode::BrCond {
                        write!(f, " {}", dfg.value_type(first))?;
                    }
                }
                let mut comma = false;
                for arg in data.args() {
                    if comma {
                        write!(f, ",")?;
                    }
                    write!(f, " {}", arg.dump(func))?;
                    comma = true;
                }
                for bb in data.blocks() {
                    if comma {
                        write!(f, ",")?;
                    }
                    write!(f, " {}", bb.dump(func))?;
                    comma = true;
                }
            }
        }
        Ok(())
    }
}
