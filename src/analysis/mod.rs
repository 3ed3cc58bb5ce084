// Copyright (c) 2017-2021 Fabian Schuiki

//! Analysis passes on the IR
//!
//! This module implements the analyses the transformation passes consume:
//! predecessor and reachability information computed from a function, and
//! value ranges provided from the outside.

mod preds;
mod range;

pub use self::preds::*;
pub use self::range::*;
