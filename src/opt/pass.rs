// Copyright (c) 2017-2021 Fabian Schuiki

use crate::analysis::RangeQuery;
use crate::ir::prelude::*;
use rayon::prelude::*;

/// An optimization pass.
///
/// The optimization infrastructure will always call `run_on_module()`. However,
/// implementors only need to provide `run_on_function()`, which is called
/// once for every function in the module.
pub trait Pass {
    /// Run this pass on an entire module.
    ///
    /// Functions are processed in parallel.
    fn run_on_module(ctx: &PassContext, module: &mut Module) -> bool {
        module
            .par_functions_mut()
            .map(|mut func| Self::run_on_function(ctx, &mut func))
            .reduce(|| false, |a, b| a || b)
    }

    /// Run this pass on an entire function.
    fn run_on_function(ctx: &PassContext, func: &mut FunctionBuilder) -> bool;
}

/// Additional context and configuration for optimizations.
///
/// The context is shared by all functions of a module while a pass runs.
pub struct PassContext<'a> {
    /// The source of value ranges. Ranges are not updated while a pass
    /// mutates the IR.
    pub ranges: &'a dyn RangeQuery,
}

impl<'a> PassContext<'a> {
    /// Create a new pass context around a range query.
    pub fn new(ranges: &'a dyn RangeQuery) -> Self {
        Self { ranges }
    }
}
