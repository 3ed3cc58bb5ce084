// Copyright (c) 2017-2021 Fabian Schuiki

//! Re-exports of commonly used IR items.

pub use crate::ir::{
    Arg, Block, BlockFlags, Function, FunctionBuilder, Inst, InstData, ModFunction, Module,
    Opcode, Signature, Value, ValueData,
};
