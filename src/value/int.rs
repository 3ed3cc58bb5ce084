// Copyright (c) 2017-2021 Fabian Schuiki

//! Integer values
//!
//! This module implements fixed-width integer constants.

use crate::ty::{int_ty, Type};
use num::{
    bigint::ToBigInt,
    traits::*,
    BigInt, BigUint,
};
use std::fmt::{Debug, Display};

/// An integer value.
///
/// The value is stored as its unsigned bit pattern. Signed interpretation is
/// available through `to_signed()`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntValue {
    /// The width of the value in bits.
    pub width: usize,
    /// The value itself.
    pub value: BigUint,
}

impl IntValue {
    /// Create a new integer value from a `usize`.
    pub fn from_usize(width: usize, value: usize) -> Self {
        Self::from_unsigned(width, value.into())
    }

    /// Create a new integer value from an `isize`.
    pub fn from_isize(width: usize, value: isize) -> Self {
        Self::from_signed(width, BigInt::from(value))
    }

    /// Create a new single-bit integer value from a `bool`.
    pub fn from_bool(value: bool) -> Self {
        Self::from_usize(1, value as usize)
    }

    /// Create a new integer value from a signed `BigInt` value.
    ///
    /// The value is wrapped around to fit into `width` bits.
    pub fn from_signed(width: usize, value: BigInt) -> Self {
        let modulus = BigInt::one() << width;
        let mut v = value % &modulus;
        if v.is_negative() {
            v += modulus;
        }
        let v = v.to_biguint().expect("wrapped value is non-negative");
        Self::from_unsigned(width, v)
    }

    /// Create a new integer value from an unsigned `BigUint` value.
    ///
    /// The value is truncated to fit into `width` bits.
    pub fn from_unsigned(width: usize, value: BigUint) -> Self {
        let value = value % (BigUint::one() << width);
        Self { width, value }
    }

    /// Convert the value to a signed `BigInt`, using two's complement.
    pub fn to_signed(&self) -> BigInt {
        let sign_mask = BigUint::one() << (self.width - 1);
        let unsigned = self.value.to_bigint().expect("unsigned fits into signed");
        if (&self.value & &sign_mask).is_zero() {
            unsigned
        } else {
            unsigned - (BigInt::one() << self.width)
        }
    }

    /// Convert the value to an unsigned `BigInt`.
    pub fn to_unsigned(&self) -> BigInt {
        self.value.to_bigint().expect("unsigned fits into signed")
    }

    /// Check if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Check if the value is one.
    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// Get the type of the value.
    pub fn ty(&self) -> Type {
        int_ty(self.width)
    }
}

impl Display for IntValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "i{} {}", self.width, self.value)
    }
}

impl Debug for IntValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_roundtrip() {
        let v = IntValue::from_isize(8, -3);
        assert_eq!(v.value, BigUint::from(253u32));
        assert_eq!(v.to_signed(), BigInt::from(-3));
        assert_eq!(v.to_unsigned(), BigInt::from(253));
    }

    #[test]
    fn wraps_to_width() {
        assert_eq!(IntValue::from_usize(4, 17).value, BigUint::from(1u32));
        assert_eq!(IntValue::from_isize(4, -9).to_signed(), BigInt::from(7));
    }

    #[test]
    fn single_bit() {
        assert!(IntValue::from_bool(false).is_zero());
        assert!(IntValue::from_bool(true).is_one());
        assert_eq!(IntValue::from_bool(true).to_signed(), BigInt::from(-1));
    }
}
