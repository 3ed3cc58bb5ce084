// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of the arguments and return type of functions.

use crate::{
    ir::Arg,
    table::PrimaryTable,
    ty::{void_ty, Type},
};
use itertools::Itertools;

/// A description of the arguments and return type of a function.
#[derive(Clone, Debug)]
pub struct Signature {
    args: PrimaryTable<Arg, Type>,
    order: Vec<Arg>,
    retty: Type,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            args: Default::default(),
            order: Default::default(),
            retty: void_ty(),
        }
    }
}

impl Signature {
    /// Create a new signature with no arguments and a `void` return type.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add an input argument.
    pub fn add_input(&mut self, ty: Type) -> Arg {
        let arg = self.args.add(ty);
        self.order.push(arg);
        arg
    }

    /// Set the return type of the signature.
    pub fn set_return_type(&mut self, ty: Type) {
        self.retty = ty;
    }

    /// Get the return type of the signature.
    pub fn return_type(&self) -> Type {
        self.retty.clone()
    }

    /// Check whether the signature has any inputs.
    pub fn has_inputs(&self) -> bool {
        !self.order.is_empty()
    }

    /// Return an iterator over the arguments of the signature.
    pub fn args<'a>(&'a self) -> impl Iterator<Item = Arg> + 'a {
        self.order.iter().cloned()
    }

    /// Return the type of argument `arg`.
    pub fn arg_type(&self, arg: Arg) -> Type {
        self.args[arg].clone()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({}) {}",
            self.args().map(|arg| self.arg_type(arg)).format(", "),
            self.retty
        )
    }
}
