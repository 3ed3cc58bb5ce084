// Copyright (c) 2017-2021 Fabian Schuiki

//! Optimization infrastructure.
//!
//! This module provides the `Pass` trait through which the driver runs
//! transformations over a module, and the `PassContext` they consume.

mod pass;

pub use self::pass::*;

/// Re-exports of the items every pass needs.
pub mod prelude {
    pub use super::pass::{Pass, PassContext};
}
