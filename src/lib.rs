// Copyright (c) 2017-2021 Fabian Schuiki

//! Range-analysis driven dead code elimination.
//!
//! This library provides a small SSA intermediate representation, an
//! interface to value ranges computed by an external range analysis, and a
//! pass that uses these ranges to fold comparisons, resolve conditional
//! branches, and prune the basic blocks that become unreachable.

#[macro_use]
extern crate log;

pub mod analysis;
pub mod assembly;
pub mod ir;
pub mod opt;
pub mod pass;
pub mod table;
pub mod ty;
pub mod value;
pub mod verifier;

pub use crate::{ty::*, value::*};
