// Copyright (c) 2017-2021 Fabian Schuiki

//! Integer value ranges.
//!
//! Ranges are computed by an external range analysis and consumed read-only.
//! This module provides the `Range` representation, the `RangeQuery`
//! interface through which passes look them up, and `RangeTable`, a simple
//! query implementation backed by precomputed per-function tables.

use crate::{
    ir::{Function, Value},
    value::IntValue,
};
use num::{traits::*, BigInt};
use std::{collections::HashMap, fmt};

/// A closed interval `[lower, upper]` of a fixed-width integer.
///
/// The bounds are stored in the signed interpretation of the `width`-bit
/// domain, so `-2^(w-1) <= lower <= upper <= 2^(w-1) - 1` always holds. The
/// full domain represents a value about which nothing is known.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Range {
    width: usize,
    lower: BigInt,
    upper: BigInt,
}

impl Range {
    /// Create a range from signed bounds.
    ///
    /// Panics if the bounds are out of order or do not fit into `width` bits.
    pub fn signed(width: usize, lower: impl Into<BigInt>, upper: impl Into<BigInt>) -> Self {
        let lower = lower.into();
        let upper = upper.into();
        assert!(width > 0, "ranges must be at least one bit wide");
        assert!(
            lower <= upper,
            "range bounds out of order: [{}, {}]",
            lower,
            upper
        );
        assert!(
            lower >= signed_min(width) && upper <= signed_max(width),
            "range [{}, {}] does not fit into i{}",
            lower,
            upper,
            width
        );
        Self {
            width,
            lower,
            upper,
        }
    }

    /// Create a range from signed bounds, if they are ordered and fit into
    /// `width` bits.
    pub fn try_signed(width: usize, lower: BigInt, upper: BigInt) -> Option<Self> {
        if width == 0
            || lower > upper
            || lower < signed_min(width)
            || upper > signed_max(width)
        {
            return None;
        }
        Some(Self {
            width,
            lower,
            upper,
        })
    }

    /// Create a range from unsigned bounds.
    ///
    /// If the unsigned interval crosses the sign boundary of the domain it
    /// cannot be represented by signed bounds and widens to the full range.
    pub fn unsigned(width: usize, lower: impl Into<BigInt>, upper: impl Into<BigInt>) -> Self {
        let lower = lower.into();
        let upper = upper.into();
        assert!(
            lower <= upper,
            "range bounds out of order: [{}, {}]",
            lower,
            upper
        );
        assert!(
            !lower.is_negative() && upper < (BigInt::one() << width),
            "range [{}, {}] does not fit into unsigned i{}",
            lower,
            upper,
            width
        );
        let boundary = BigInt::one() << (width - 1);
        if upper < boundary {
            Self::signed(width, lower, upper)
        } else if lower >= boundary {
            let modulus = BigInt::one() << width;
            Self::signed(width, lower - &modulus, upper - &modulus)
        } else {
            Self::full(width)
        }
    }

    /// Create the range that covers every value of a `width`-bit integer.
    pub fn full(width: usize) -> Self {
        Self::signed(width, signed_min(width), signed_max(width))
    }

    /// Create the range that contains exactly one constant.
    pub fn constant(value: &IntValue) -> Self {
        let v = value.to_signed();
        Self::signed(value.width, v.clone(), v)
    }

    /// Return the width of the integer domain in bits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Return the signed lower bound.
    pub fn lower(&self) -> &BigInt {
        &self.lower
    }

    /// Return the signed upper bound.
    pub fn upper(&self) -> &BigInt {
        &self.upper
    }

    /// Return the bounds of the range in the unsigned interpretation.
    ///
    /// A range that contains both negative and non-negative values wraps
    /// around in the unsigned domain and is thus widened to the full unsigned
    /// range.
    pub fn unsigned_bounds(&self) -> (BigInt, BigInt) {
        let modulus = BigInt::one() << self.width;
        if !self.lower.is_negative() {
            (self.lower.clone(), self.upper.clone())
        } else if self.upper.is_negative() {
            (&self.lower + &modulus, &self.upper + &modulus)
        } else {
            (BigInt::zero(), modulus - BigInt::one())
        }
    }

    /// Check whether the range covers the entire domain.
    pub fn is_full(&self) -> bool {
        self.lower == signed_min(self.width) && self.upper == signed_max(self.width)
    }

    /// Check whether the range contains exactly one value.
    pub fn is_constant(&self) -> bool {
        self.lower == self.upper
    }

    /// Check whether a signed value lies within the range.
    pub fn contains(&self, value: &BigInt) -> bool {
        &self.lower <= value && value <= &self.upper
    }

    /// Check whether two ranges have no value in common.
    pub fn is_disjoint(&self, other: &Range) -> bool {
        self.upper < other.lower || other.upper < self.lower
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "i{} [{}, {}]", self.width, self.lower, self.upper)
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

fn signed_min(width: usize) -> BigInt {
    -(BigInt::one() << (width - 1))
}

fn signed_max(width: usize) -> BigInt {
    (BigInt::one() << (width - 1)) - BigInt::one()
}

/// A source of value ranges.
///
/// Implementations must return the same answer for the same query for as
/// long as a pass runs, and must be shareable across threads since functions
/// of a module are processed in parallel.
pub trait RangeQuery: Sync {
    /// Return the range of `value` within `func`, if one is known.
    fn get_range(&self, func: &Function, value: Value) -> Option<Range>;
}

/// A range query that knows nothing.
///
/// Every lookup yields `None`. It is `range_of` that then falls back to the
/// singleton range of a constant or the full range of the value's type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRanges;

impl RangeQuery for NoRanges {
    fn get_range(&self, _func: &Function, _value: Value) -> Option<Range> {
        None
    }
}

/// A precomputed table of ranges, keyed by function name and value.
#[derive(Debug, Clone, Default)]
pub struct RangeTable {
    ranges: HashMap<String, HashMap<Value, Range>>,
}

impl RangeTable {
    /// Create an empty range table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Record the range of a value in a function.
    ///
    /// Returns the range previously recorded for the value, if any.
    pub fn insert(&mut self, func: impl Into<String>, value: Value, range: Range) -> Option<Range> {
        self.ranges
            .entry(func.into())
            .or_insert_with(HashMap::new)
            .insert(value, range)
    }

    /// Look up the range of a value in a function.
    pub fn get(&self, func: &str, value: Value) -> Option<&Range> {
        self.ranges.get(func).and_then(|values| values.get(&value))
    }

    /// Iterate over the ranges recorded for a function.
    pub fn function_ranges<'a>(
        &'a self,
        func: &str,
    ) -> impl Iterator<Item = (Value, &'a Range)> + 'a {
        self.ranges
            .get(func)
            .into_iter()
            .flat_map(|values| values.iter().map(|(&v, r)| (v, r)))
    }

    /// Check whether the table holds no ranges at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.values().all(HashMap::is_empty)
    }
}

impl RangeQuery for RangeTable {
    fn get_range(&self, func: &Function, value: Value) -> Option<Range> {
        self.get(&func.name, value).cloned()
    }
}

impl<T: RangeQuery + ?Sized> RangeQuery for &T {
    fn get_range(&self, func: &Function, value: Value) -> Option<Range> {
        (**self).get_range(func, value)
    }
}

/// Determine the range of a value as seen by a pass.
///
/// Asks the `query` first. Constants the query knows nothing about have the
/// singleton range of their value; everything else is unknown and yields the
/// full range of its type. Returns `None` only for non-integer values.
pub fn range_of(query: &dyn RangeQuery, func: &Function, value: Value) -> Option<Range> {
    let ty = func.dfg.value_type(value);
    if !ty.is_int() {
        return None;
    }
    let width = ty.unwrap_int();
    if let Some(range) = query.get_range(func, value) {
        if range.width() == width {
            return Some(range);
        }
        warn!(
            "Ignoring {} for {} in {}, which is i{}",
            range,
            value.dump(func),
            func.name,
            width
        );
    }
    Some(match func.dfg.get_const_int(value) {
        Some(imm) => Range::constant(imm),
        None => Range::full(width),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_range_bounds() {
        let r = Range::full(8);
        assert_eq!(r.lower(), &BigInt::from(-128));
        assert_eq!(r.upper(), &BigInt::from(127));
        assert!(r.is_full());
        assert_eq!(
            r.unsigned_bounds(),
            (BigInt::from(0), BigInt::from(255))
        );
    }

    #[test]
    fn unsigned_ranges_map_into_signed_domain() {
        let low = Range::unsigned(8, 3, 9);
        assert_eq!((low.lower(), low.upper()), (&BigInt::from(3), &BigInt::from(9)));
        let high = Range::unsigned(8, 200, 255);
        assert_eq!(
            (high.lower(), high.upper()),
            (&BigInt::from(-56), &BigInt::from(-1))
        );
        assert_eq!(
            high.unsigned_bounds(),
            (BigInt::from(200), BigInt::from(255))
        );
        assert!(Range::unsigned(8, 100, 200).is_full());
    }

    #[test]
    fn straddling_range_is_full_when_unsigned() {
        let r = Range::signed(8, -1, 1);
        assert_eq!(r.unsigned_bounds(), (BigInt::from(0), BigInt::from(255)));
    }

    #[test]
    fn constant_range() {
        let r = Range::constant(&IntValue::from_isize(16, -7));
        assert!(r.is_constant());
        assert!(r.contains(&BigInt::from(-7)));
        assert!(!r.contains(&BigInt::from(7)));
    }

    #[test]
    fn disjointness() {
        let a = Range::signed(32, 0, 10);
        assert!(a.is_disjoint(&Range::signed(32, 11, 20)));
        assert!(!a.is_disjoint(&Range::signed(32, 10, 20)));
        assert!(Range::signed(32, 11, 20).is_disjoint(&a));
    }

    #[test]
    fn no_ranges_falls_back_in_range_of() {
        use crate::ir::{FunctionBuilder, Signature};
        use crate::ty::int_ty;

        let mut sig = Signature::new();
        sig.add_input(int_ty(8));
        sig.set_return_type(int_ty(8));
        let mut func = Function::new("n", sig);
        let x = func.arg_value(0);
        let mut builder = FunctionBuilder::new(&mut func);
        let bb = builder.block();
        builder.append_to(bb);
        let k = builder.ins().const_int(IntValue::from_isize(8, -3));
        builder.ins().ret_value(k);

        assert_eq!(NoRanges.get_range(&func, x), None);
        assert_eq!(NoRanges.get_range(&func, k), None);
        assert_eq!(range_of(&NoRanges, &func, x), Some(Range::full(8)));
        assert_eq!(range_of(&NoRanges, &func, k), Some(Range::signed(8, -3, -3)));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn out_of_domain_panics() {
        Range::signed(4, 0, 8);
    }
}
