// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of the data flow in a `Function`.
//!
//! Each function has an associated `DataFlowGraph` which contains all the
//! values, instructions, arguments, and links between them.

use crate::{
    impl_table_indexing,
    ir::{Arg, Block, Function, Inst, InstData, Signature, Value, ValueData},
    table::{PrimaryTable, SecondaryTable},
    ty::Type,
    value::IntValue,
};
use std::collections::HashMap;

/// A data flow graph.
///
/// This is the main container for instructions, values, and the relationship
/// between them.
#[derive(Debug, Clone, Default)]
pub struct DataFlowGraph {
    /// The instructions in the graph.
    pub(crate) insts: PrimaryTable<Inst, InstData>,
    /// The result values produced by instructions.
    pub(crate) results: SecondaryTable<Inst, Value>,
    /// The values in the graph.
    pub(crate) values: PrimaryTable<Value, ValueData>,
    /// The argument values.
    pub(crate) args: SecondaryTable<Arg, Value>,
    /// The names assigned to values.
    pub(crate) names: HashMap<Value, String>,
}

impl_table_indexing!(DataFlowGraph, insts, Inst, InstData);
impl_table_indexing!(DataFlowGraph, values, Value, ValueData);

impl DataFlowGraph {
    /// Create a new data flow graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a placeholder value.
    ///
    /// This function is intended to be used for forward references, for
    /// example phi nodes whose incoming values are defined later.
    pub fn add_placeholder(&mut self, ty: Type) -> Value {
        self.values.add(ValueData::Placeholder { ty })
    }

    /// Remove a placeholder value.
    pub fn remove_placeholder(&mut self, value: Value) {
        assert!(!self.has_uses(value), "placeholder {} still in use", value);
        assert!(self[value].is_placeholder());
        self.values.remove(value);
    }

    /// Add an undefined value.
    pub fn add_undef(&mut self, ty: Type) -> Value {
        self.values.add(ValueData::Undef { ty })
    }

    /// Add an instruction.
    pub fn add_inst(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.insts.add(data);
        if !ty.is_void() {
            let result = self.values.add(ValueData::Inst { ty, inst });
            self.results.add(inst, result);
        }
        inst
    }

    /// Remove an instruction.
    ///
    /// The result of the instruction must no longer be used.
    pub fn remove_inst(&mut self, inst: Inst) {
        if let Some(value) = self.results.remove(inst) {
            assert!(
                !self.has_uses(value),
                "removed inst {} whose result {} is still in use",
                inst,
                value
            );
            self.values.remove(value);
            self.names.remove(&value);
        }
        self.insts.remove(inst);
    }

    /// Check whether an instruction is part of the graph.
    pub fn contains_inst(&self, inst: Inst) -> bool {
        self.insts.contains(inst)
    }

    /// Check whether a value is part of the graph.
    pub fn contains_value(&self, value: Value) -> bool {
        self.values.contains(value)
    }

    /// Returns whether an instruction produces a result.
    pub fn has_result(&self, inst: Inst) -> bool {
        self.results.contains(inst)
    }

    /// Returns the result of an instruction.
    pub fn inst_result(&self, inst: Inst) -> Value {
        self.results[inst]
    }

    /// Returns the result of an instruction, if it has one.
    pub fn get_inst_result(&self, inst: Inst) -> Option<Value> {
        self.results.get(inst).cloned()
    }

    /// Returns the value of an argument.
    pub fn arg_value(&self, arg: Arg) -> Value {
        self.args[arg]
    }

    /// Create values for the arguments in a signature.
    pub(crate) fn make_args_for_signature(&mut self, sig: &Signature) {
        for arg in sig.args() {
            let value = self.values.add(ValueData::Arg {
                ty: sig.arg_type(arg),
                arg,
            });
            self.args.add(arg, value);
        }
    }

    /// Returns the type of a value.
    pub fn value_type(&self, value: Value) -> Type {
        self[value].ty().clone()
    }

    /// Returns the type of an instruction.
    ///
    /// Instructions without a result have type `void`.
    pub fn inst_type(&self, inst: Inst) -> Type {
        match self.get_inst_result(inst) {
            Some(value) => self.value_type(value),
            None => crate::ty::void_ty(),
        }
    }

    /// Return the instruction that produces `value`.
    pub fn get_value_inst(&self, value: Value) -> Option<Inst> {
        match self[value] {
            ValueData::Inst { inst, .. } => Some(inst),
            _ => None,
        }
    }

    /// Return the instruction that produces `value`, or panic.
    pub fn value_inst(&self, value: Value) -> Inst {
        match self.get_value_inst(value) {
            Some(inst) => inst,
            None => panic!("value {} not the result of an instruction", value),
        }
    }

    /// Return the constant integer carried by `value`, if it is the result of
    /// a `const` instruction.
    pub fn get_const_int(&self, value: Value) -> Option<&IntValue> {
        self.get_value_inst(value)
            .and_then(|inst| self[inst].get_const_int())
    }

    /// Return the name of a value.
    pub fn get_name(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(AsRef::as_ref)
    }

    /// Set the name of a value.
    pub fn set_name(&mut self, value: Value, name: String) {
        self.names.insert(value, name);
    }

    /// Clear the name of a value.
    pub fn clear_name(&mut self, value: Value) -> Option<String> {
        self.names.remove(&value)
    }

    /// Replace all uses of a value with another.
    ///
    /// Returns how many uses were replaced.
    pub fn replace_use(&mut self, from: Value, to: Value) -> usize {
        let mut count = 0;
        for inst in self.insts.keys().collect::<Vec<_>>() {
            count += self.insts[inst].replace_value(from, to);
        }
        count
    }

    /// Replace the uses of a block with another, but only within one
    /// instruction.
    ///
    /// Returns how many uses were replaced.
    pub fn replace_block_within_inst(&mut self, from: Block, to: Block, inst: Inst) -> usize {
        self[inst].replace_block(from, to)
    }

    /// Remove one incoming edge from `block` in a phi instruction.
    ///
    /// Returns the incoming value of the removed edge, if there was one.
    pub fn remove_phi_incoming(&mut self, inst: Inst, block: Block) -> Option<Value> {
        self[inst].remove_phi_incoming(block)
    }

    /// Iterate over all uses of a value.
    ///
    /// Yields the using instruction and the argument position.
    pub fn uses(&self, value: Value) -> impl Iterator<Item = (Inst, usize)> {
        let mut uses = vec![];
        for (inst, data) in self.insts.iter() {
            for (i, arg) in data.args().iter().cloned().enumerate() {
                if arg == value {
                    uses.push((inst, i));
                }
            }
        }
        uses.into_iter()
    }

    /// Check if a value is used.
    pub fn has_uses(&self, value: Value) -> bool {
        self.uses(value).next().is_some()
    }
}

impl Value {
    /// Dump the value in human readable form.
    pub fn dump(self, func: &Function) -> ValueDumper {
        ValueDumper(self, func)
    }
}

/// Temporary object to dump a `Value` in human-readable form for debugging.
pub struct ValueDumper<'a>(Value, &'a Function);

impl std::fmt::Display for ValueDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let dfg = &self.1.dfg;
        if !dfg.contains_value(self.0) {
            return write!(f, "%<dangling {}>", self.0);
        }
        if dfg[self.0].is_undef() {
            return write!(f, "undef");
        }
        match dfg.get_name(self.0) {
            Some(name) => write!(f, "%{}", name),
            None => write!(f, "%{}", self.0),
        }
    }
}
