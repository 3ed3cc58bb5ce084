// Copyright (c) 2017-2021 Fabian Schuiki

//! Verification of IR integrity.
//!
//! This module implements verification of the intermediate representation. It
//! checks that functions are well-formed, basic blocks have terminators, phi
//! nodes agree with the control flow graph, and types line up.

use crate::{
    analysis::PredecessorTable,
    ir::{prelude::*, InstData, ValueData},
    ty::{void_ty, Type},
};
use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
};

/// An IR verifier.
///
/// The `Verifier` acts as a context to call the various IR checking functions
/// on. It keeps track of errors.
#[derive(Default)]
pub struct Verifier {
    errors: VerifierErrors,
    func_name: Option<String>,
    return_type: Option<Type>,
}

impl Verifier {
    /// Create a new verifier.
    pub fn new() -> Self {
        Default::default()
    }

    /// Verify the integrity of a `Module`.
    pub fn verify_module(&mut self, module: &Module) {
        for func in module.functions() {
            self.verify_function(&module[func]);
        }
    }

    /// Verify the integrity of a `Function`.
    pub fn verify_function(&mut self, func: &Function) {
        self.func_name = Some(format!("func @{}", func.name));
        self.return_type = Some(func.sig.return_type());

        let entry = match func.layout.first_block() {
            Some(entry) => entry,
            None => {
                self.error(None, format!("layout has no entry block"));
                self.func_name = None;
                self.return_type = None;
                return;
            }
        };
        if func.phis(entry).next().is_some() {
            self.error(
                Some(entry.dump(func).to_string()),
                format!("entry block must not contain phi nodes"),
            );
        }

        let mut blocks_valid = true;
        for bb in func.blocks() {
            // Check that the block has at least one instruction.
            if func.layout.first_inst(bb).is_none() {
                blocks_valid = false;
                self.error(Some(bb.dump(func).to_string()), format!("block is empty"));
            }

            let mut past_phis = false;
            for inst in func.insts(bb) {
                let opcode = func.dfg[inst].opcode();

                // Check that phi nodes are grouped at the start of the block.
                if opcode.is_phi() && past_phis {
                    self.error(
                        Some(inst.dump(func).to_string()),
                        format!("phi must be at the beginning of block {}", bb.dump(func)),
                    );
                }
                past_phis |= !opcode.is_phi();

                // Check that there are no terminator instructions in the middle
                // of the block.
                if opcode.is_terminator() && Some(inst) != func.layout.last_inst(bb) {
                    self.error(
                        Some(inst.dump(func).to_string()),
                        format!("terminator must be at the end of block {}", bb.dump(func)),
                    );
                }

                // Check that the last instruction in the block is a terminator.
                if Some(inst) == func.layout.last_inst(bb) && !opcode.is_terminator() {
                    blocks_valid = false;
                    self.error(
                        Some(bb.dump(func).to_string()),
                        format!("last instruction `{}` must be a terminator", inst.dump(func)),
                    );
                }

                // Check the instruction itself.
                blocks_valid &= self.verify_inst(inst, func);
            }
        }

        // Only consult the control flow graph once all block references are
        // known to be live.
        if blocks_valid {
            let pt = PredecessorTable::new(func);
            for bb in func.blocks() {
                let mut preds: Vec<Block> = pt.pred_edges(bb).to_vec();
                preds.sort();
                for phi in func.phis(bb) {
                    let mut incoming: Vec<Block> = func.dfg[phi].blocks().to_vec();
                    incoming.sort();
                    if incoming != preds {
                        self.error(
                            Some(phi.dump(func).to_string()),
                            format!(
                                "phi entries must match predecessor edges [{}]",
                                itertools::join(preds.iter().map(|bb| bb.dump(func)), ", ")
                            ),
                        );
                    }
                }
            }
        }

        self.func_name = None;
        self.return_type = None;
    }

    /// Finish verification and return the result.
    ///
    /// Consumes the verifier.
    pub fn finish(self) -> Result<(), VerifierErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Finish verification and panic if errors occurred.
    ///
    /// Consumes the verifier.
    pub fn finish_panic(self) {
        match self.finish() {
            Ok(()) => (),
            Err(errs) => panic!("Verification failed:\n{}", errs),
        }
    }

    /// Verify the integrity of a single instruction.
    ///
    /// Returns `false` if the instruction refers to a block that does not
    /// exist.
    pub fn verify_inst(&mut self, inst: Inst, func: &Function) -> bool {
        InstVerifier {
            verifier: self,
            func,
        }
        .verify_inst(inst)
    }

    fn error(&mut self, object: Option<String>, message: String) {
        self.errors.push(VerifierError {
            func: self.func_name.clone(),
            object,
            message,
        });
    }
}

/// An instruction verifier.
struct InstVerifier<'a> {
    verifier: &'a mut Verifier,
    func: &'a Function,
}

impl<'a> Deref for InstVerifier<'a> {
    type Target = Verifier;
    fn deref(&self) -> &Verifier {
        self.verifier
    }
}

impl<'a> DerefMut for InstVerifier<'a> {
    fn deref_mut(&mut self) -> &mut Verifier {
        self.verifier
    }
}

impl<'a> InstVerifier<'a> {
    fn is_value_defined(&self, value: Value) -> bool {
        if !self.func.dfg.contains_value(value) {
            return false;
        }
        match self.func.dfg[value] {
            ValueData::Inst { inst, .. } => self.func.layout.inst_block(inst).is_some(),
            ValueData::Arg { .. } => true,
            ValueData::Undef { .. } => true,
            ValueData::Placeholder { .. } => false,
        }
    }

    fn is_block_defined(&self, block: Block) -> bool {
        self.func.contains_block(block)
    }

    fn inst_error(&mut self, inst: Inst, message: String) {
        let object = inst.dump(self.func).to_string();
        self.verifier.error(Some(object), message);
    }

    /// Verify the integrity of a single instruction.
    pub fn verify_inst(&mut self, inst: Inst) -> bool {
        let func = self.func;
        let data = &func.dfg[inst];

        // Check that all arguments and blocks have a definition.
        let mut args_valid = true;
        for &value in data.args() {
            if !self.is_value_defined(value) {
                args_valid = false;
                self.inst_error(
                    inst,
                    format!("value {} has no definition", value.dump(func)),
                );
            }
        }
        let mut blocks_valid = true;
        for &block in data.blocks() {
            if !self.is_block_defined(block) {
                blocks_valid = false;
                self.inst_error(
                    inst,
                    format!("block {} has no definition", block.dump(func)),
                );
            }
        }
        if !args_valid || !blocks_valid {
            return blocks_valid;
        }

        // Check for instruction-specific invariants. This match block acts as
        // the source of truth for all restrictions imposed by instructions.
        match data.opcode() {
            Opcode::ConstInt => self.assert_format(inst, |d| match d {
                InstData::ConstInt { .. } => true,
                _ => false,
            }),
            Opcode::Add | Opcode::Sub => {
                self.assert_format(inst, |d| match d {
                    InstData::Binary { .. } => true,
                    _ => false,
                });
                self.verify_int_ty(inst, func.dfg.inst_type(inst));
                self.verify_args_match_inst_ty(inst);
            }
            Opcode::Eq
            | Opcode::Neq
            | Opcode::Slt
            | Opcode::Sgt
            | Opcode::Sle
            | Opcode::Sge
            | Opcode::Ult
            | Opcode::Ugt
            | Opcode::Ule
            | Opcode::Uge => {
                self.assert_format(inst, |d| match d {
                    InstData::Binary { .. } => true,
                    _ => false,
                });
                self.verify_bool_ty(inst, func.dfg.inst_type(inst));
                self.verify_arg_tys_match(inst);
                self.verify_int_ty(inst, func.dfg.value_type(data.args()[0]));
            }
            Opcode::Phi => {
                self.assert_format(inst, |d| match d {
                    InstData::Phi { .. } => true,
                    _ => false,
                });
                self.verify_args_match_inst_ty(inst);
            }
            Opcode::BlockAddr => {
                self.assert_format(inst, |d| match d {
                    InstData::Jump { .. } => true,
                    _ => false,
                });
                let target = data.blocks()[0];
                if !func.is_address_taken(target) {
                    self.inst_error(
                        inst,
                        format!("block {} must be marked address-taken", target.dump(func)),
                    );
                }
            }
            Opcode::Ret => {
                self.assert_format(inst, |d| match d {
                    InstData::Nullary { .. } => true,
                    _ => false,
                });
                self.verify_return_type(inst, &void_ty());
            }
            Opcode::RetValue => {
                self.assert_format(inst, |d| match d {
                    InstData::Unary { .. } => true,
                    _ => false,
                });
                let ty = func.dfg.value_type(data.args()[0]);
                self.verify_return_type(inst, &ty);
            }
            Opcode::Br => self.assert_format(inst, |d| match d {
                InstData::Jump { .. } => true,
                _ => false,
            }),
            Opcode::BrCond => {
                self.assert_format(inst, |d| match d {
                    InstData::Branch { .. } => true,
                    _ => false,
                });
                let ty = func.dfg.value_type(data.args()[0]);
                self.verify_bool_ty(inst, ty);
            }
        }
        true
    }

    /// Verify that an instruction has the format its opcode requires.
    fn assert_format(&mut self, inst: Inst, check: impl Fn(&InstData) -> bool) {
        let data = &self.func.dfg[inst];
        if !check(data) {
            panic!(
                "{0:?} ({0}) has unexpected format {1:?}",
                data.opcode(),
                data
            );
        }
    }

    /// Verify that the types of an instruction's arguments agree.
    fn verify_arg_tys_match(&mut self, inst: Inst) {
        let func = self.func;
        let ty = match func.dfg[inst].args().get(0) {
            Some(&arg) => func.dfg.value_type(arg),
            None => return,
        };
        let mismatch = func.dfg[inst].args()[1..]
            .iter()
            .any(|&arg| func.dfg.value_type(arg) != ty);
        if mismatch {
            let tys = itertools::join(
                func.dfg[inst]
                    .args()
                    .iter()
                    .map(|&arg| func.dfg.value_type(arg)),
                ", ",
            );
            self.inst_error(
                inst,
                format!("argument types must match (but are {})", tys),
            );
        }
    }

    /// Verify that the types of an instruction's arguments match the return
    /// type of the instruction itself.
    fn verify_args_match_inst_ty(&mut self, inst: Inst) {
        let func = self.func;
        let ty = func.dfg.inst_type(inst);
        for &arg in func.dfg[inst].args() {
            let arg_ty = func.dfg.value_type(arg);
            if arg_ty != ty {
                self.inst_error(
                    inst,
                    format!(
                        "argument {} must be of type {} (but is {})",
                        arg.dump(func),
                        ty,
                        arg_ty
                    ),
                );
            }
        }
    }

    /// Verify that a type is `i1`.
    fn verify_bool_ty(&mut self, inst: Inst, ty: Type) {
        if ty.is_int() && ty.unwrap_int() == 1 {
            return;
        }
        self.inst_error(inst, format!("type must be i1 (but is {})", ty));
    }

    /// Verify that a type is an integer.
    fn verify_int_ty(&mut self, inst: Inst, ty: Type) {
        if !ty.is_int() {
            self.inst_error(inst, format!("type must be an integer (but is {})", ty));
        }
    }

    fn verify_return_type(&mut self, inst: Inst, ty: &Type) {
        let func_ty = self.return_type.clone().unwrap_or_else(void_ty);
        if func_ty != *ty {
            self.inst_error(
                inst,
                format!(
                    "requires function to have return type {} (but has {})",
                    ty, func_ty
                ),
            );
        }
    }
}

/// A verification error.
#[derive(Debug)]
pub struct VerifierError {
    /// The function within which the error occurred.
    pub func: Option<String>,
    /// The object which caused the error.
    pub object: Option<String>,
    /// The error message.
    pub message: String,
}

impl Display for VerifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(ref func) = self.func {
            write!(f, "{}: ", func)?;
        }
        if let Some(ref object) = self.object {
            write!(f, "{}: ", object)?;
        }
        write!(f, "{}", self.message)?;
        Ok(())
    }
}

/// A list of verification errors.
#[derive(Debug, Default)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl Deref for VerifierErrors {
    type Target = Vec<VerifierError>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for VerifierErrors {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for VerifierErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for err in self.iter() {
            writeln!(f, "- {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for VerifierErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::int_ty;
    use crate::value::IntValue;

    fn errors(func: &Function) -> Vec<String> {
        let mut verifier = Verifier::new();
        verifier.verify_function(func);
        match verifier.finish() {
            Ok(()) => vec![],
            Err(errs) => errs.iter().map(|e| e.message.clone()).collect(),
        }
    }

    fn two_blocks() -> (Function, Block, Block) {
        let mut sig = Signature::new();
        sig.set_return_type(int_ty(8));
        let mut func = Function::new("v", sig);
        let mut builder = FunctionBuilder::new(&mut func);
        let entry = builder.block();
        let exit = builder.block();
        (func, entry, exit)
    }

    #[test]
    fn well_formed_function() {
        let (mut func, entry, exit) = two_blocks();
        let mut builder = FunctionBuilder::new(&mut func);
        builder.append_to(entry);
        let k = builder.ins().const_int(IntValue::from_usize(8, 1));
        builder.ins().br(exit);
        builder.append_to(exit);
        let r = builder.ins().phi(vec![k], vec![entry]);
        builder.ins().ret_value(r);
        assert_eq!(errors(&func), Vec::<String>::new());
    }

    #[test]
    fn phi_must_match_predecessors() {
        let (mut func, entry, exit) = two_blocks();
        let mut builder = FunctionBuilder::new(&mut func);
        builder.append_to(entry);
        let k = builder.ins().const_int(IntValue::from_usize(8, 1));
        builder.ins().br(exit);
        builder.append_to(exit);
        let r = builder.ins().phi(vec![k, k], vec![entry, entry]);
        builder.ins().ret_value(r);
        let errs = errors(&func);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("phi entries must match"));
    }

    #[test]
    fn missing_terminator_and_wrong_return() {
        let (mut func, entry, exit) = two_blocks();
        let mut builder = FunctionBuilder::new(&mut func);
        builder.append_to(entry);
        builder.ins().const_int(IntValue::from_usize(8, 1));
        builder.append_to(exit);
        builder.ins().ret();
        let errs = errors(&func);
        assert_eq!(errs.len(), 2, "{:?}", errs);
        assert!(errs[0].starts_with("last instruction"));
        assert!(errs[1].starts_with("requires function to have return type void"));
    }

    #[test]
    fn entry_must_not_have_phis() {
        let (mut func, entry, exit) = two_blocks();
        let mut builder = FunctionBuilder::new(&mut func);
        builder.append_to(exit);
        let k = builder.ins().const_int(IntValue::from_usize(8, 1));
        builder.ins().br(entry);
        builder.append_to(entry);
        let r = builder.ins().phi(vec![k], vec![exit]);
        builder.ins().ret_value(r);
        let errs = errors(&func);
        assert!(errs.iter().any(|e| e.contains("entry block")), "{:?}", errs);
    }

    #[test]
    fn comparison_operands_must_agree() {
        let (mut func, entry, _) = two_blocks();
        let mut builder = FunctionBuilder::new(&mut func);
        builder.append_to(entry);
        let a = builder.ins().const_int(IntValue::from_usize(8, 1));
        let b = builder.ins().const_int(IntValue::from_usize(16, 1));
        builder.ins().slt(a, b);
        builder.ins().ret_value(a);
        let errs = errors(&func);
        assert!(
            errs.iter().any(|e| e.starts_with("argument types must match")),
            "{:?}",
            errs
        );
    }
}
