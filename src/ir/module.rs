// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of a collection of functions.
//!
//! This module implements the `Module`, the root node of the intermediate
//! representation and the unit of information ingested by the reader and
//! emitted by the writer.

use crate::{
    impl_table_indexing, impl_table_key,
    ir::{Function, FunctionBuilder},
    table::PrimaryTable,
};
use rayon::prelude::*;

impl_table_key! {
    /// A function within a module.
    struct ModFunction(u32) as "f";
}

/// A module.
///
/// Functions never alias each other's blocks or values, which allows passes
/// to process them in parallel.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// The functions in this module.
    funcs: PrimaryTable<ModFunction, Function>,
}

impl_table_indexing!(Module, funcs, ModFunction, Function);

impl Module {
    /// Create a new empty module.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a function to the module.
    pub fn add_function(&mut self, func: Function) -> ModFunction {
        self.funcs.add(func)
    }

    /// Return an iterator over the functions in this module.
    pub fn functions<'a>(&'a self) -> impl Iterator<Item = ModFunction> + 'a {
        self.funcs.keys()
    }

    /// Find a function by name.
    pub fn lookup_function(&self, name: &str) -> Option<ModFunction> {
        self.funcs
            .iter()
            .find(|(_, func)| func.name == name)
            .map(|(key, _)| key)
    }

    /// Return a parallel iterator over mutable builders for all functions.
    pub fn par_functions_mut<'a>(
        &'a mut self,
    ) -> impl ParallelIterator<Item = FunctionBuilder<'a>> + 'a {
        self.funcs
            .values_mut()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(FunctionBuilder::new)
    }

    /// Verify the integrity of every function in the module.
    ///
    /// Panics if any of the functions is malformed.
    pub fn verify(&self) {
        for (_, func) in self.funcs.iter() {
            func.verify();
        }
    }
}
