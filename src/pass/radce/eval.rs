// Copyright (c) 2017-2021 Fabian Schuiki

//! Comparison evaluation on value ranges.

use crate::{analysis::Range, ir::Opcode};
use num::BigInt;

/// Evaluate a comparison on two value ranges.
///
/// Returns `Some(outcome)` if every pair of concrete values drawn from `r0`
/// and `r1` yields the same outcome, and `None` if the ranges do not decide
/// the comparison. Only `slt`, `sgt`, `eq`, `neq`, and `ult` are decided;
/// every other opcode, as well as ranges of different width, yields `None`.
pub fn evaluate(opcode: Opcode, r0: &Range, r1: &Range) -> Option<bool> {
    if r0.width() != r1.width() {
        return None;
    }
    let outcome = match opcode {
        Opcode::Slt => less_than((r0.lower(), r0.upper()), (r1.lower(), r1.upper())),
        Opcode::Sgt => less_than((r1.lower(), r1.upper()), (r0.lower(), r0.upper())),
        Opcode::Eq if r0.is_disjoint(r1) => Some(false),
        Opcode::Neq if r0.is_disjoint(r1) => Some(true),
        Opcode::Ult => {
            let (lo0, hi0) = r0.unsigned_bounds();
            let (lo1, hi1) = r1.unsigned_bounds();
            less_than((&lo0, &hi0), (&lo1, &hi1))
        }
        _ => None,
    };
    trace!("Evaluated {} {}, {} to {:?}", opcode, r0, r1, outcome);
    outcome
}

/// Decide `a < b` for all `a` in `[lo0, hi0]` and `b` in `[lo1, hi1]`.
fn less_than(
    (lo0, hi0): (&BigInt, &BigInt),
    (lo1, hi1): (&BigInt, &BigInt),
) -> Option<bool> {
    if hi0 < lo1 {
        Some(true)
    } else if lo0 >= hi1 {
        Some(false)
    } else {
        None
    }
}
