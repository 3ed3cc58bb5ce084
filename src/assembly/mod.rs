// Copyright (c) 2017-2021 Fabian Schuiki

//! Facilities to emit a module as human-readable assembly, or to parse such
//! assembly back into a module.
//!
//! Value ranges travel alongside the functions as `range` directives:
//!
//! ```text
//! func @f (i32 %x) i32 {
//! %entry:
//!     %c5 = const i32 5
//!     %cond = slt i32 %x, %c5
//!     br %cond, %then, %else
//! %then: !addrtaken
//!     br %else
//! %else:
//!     %r = phi i32 [%x, %entry], [%c5, %then]
//!     ret i32 %r
//! }
//! range @f %x [10, 20]
//! ```

pub mod reader;
pub mod writer;

pub use self::reader::{parse_module, parse_str};
pub use self::writer::{write_string, write_string_with_ranges, Writer};
