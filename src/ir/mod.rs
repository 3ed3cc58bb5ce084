// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of functions and their control flow graphs.
//!
//! This module implements the intermediate representation the range-based
//! simplification operates on: an SSA form where instructions, values, and
//! basic blocks live in arenas and refer to each other through opaque keys.

use crate::{impl_table_key, ty::Type};

mod cfg;
mod dfg;
mod function;
mod inst;
mod layout;
mod module;
pub mod prelude;
mod sig;

pub use self::cfg::*;
pub use self::dfg::*;
pub use self::function::*;
pub use self::inst::*;
pub use self::layout::*;
pub use self::module::*;
pub use self::sig::*;

impl_table_key! {
    /// An instruction.
    struct Inst(u32) as "i";

    /// A value.
    struct Value(u32) as "v";

    /// A basic block.
    struct Block(u32) as "bb";

    /// An argument of a `Function`.
    struct Arg(u32) as "arg";
}

/// Internal table storage for values.
#[derive(Debug, Clone)]
pub enum ValueData {
    /// The value is the result of an instruction.
    Inst { ty: Type, inst: Inst },
    /// The value is an argument of the `Function`.
    Arg { ty: Type, arg: Arg },
    /// The value is undefined. Stands in for results of removed
    /// instructions that are still referenced from unreachable code.
    Undef { ty: Type },
    /// The value is a forward reference yet to be resolved.
    Placeholder { ty: Type },
}

impl ValueData {
    /// Return the type of the value.
    pub fn ty(&self) -> &Type {
        match self {
            ValueData::Inst { ty, .. } => ty,
            ValueData::Arg { ty, .. } => ty,
            ValueData::Undef { ty } => ty,
            ValueData::Placeholder { ty } => ty,
        }
    }

    /// Check if the value is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        match self {
            ValueData::Placeholder { .. } => true,
            _ => false,
        }
    }

    /// Check if the value is undefined.
    pub fn is_undef(&self) -> bool {
        match self {
            ValueData::Undef { .. } => true,
            _ => false,
        }
    }
}
