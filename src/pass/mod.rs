// Copyright (c) 2017-2021 Fabian Schuiki

//! Optimization passes on the IR.
//!
//! This module implements the passes that mutate a module's functions.

pub mod radce;

pub use radce::RangeDeadCodeElim;
