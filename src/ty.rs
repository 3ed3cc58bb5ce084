// Copyright (c) 2017-2021 Fabian Schuiki

//! Types of values.

use std::sync::Arc;

pub use self::TypeKind::*;

/// A type.
pub type Type = Arc<TypeKind>;

/// The different kinds of types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The `void` type.
    VoidType,
    /// Integer types like `i32`.
    IntType(usize),
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            VoidType => write!(f, "void"),
            IntType(l) => write!(f, "i{}", l),
        }
    }
}

impl TypeKind {
    /// Check if this is a void type.
    pub fn is_void(&self) -> bool {
        match *self {
            VoidType => true,
            _ => false,
        }
    }

    /// Check if this is an integer type.
    pub fn is_int(&self) -> bool {
        match *self {
            IntType(..) => true,
            _ => false,
        }
    }

    /// Unwrap the type to its integer bit width, or panic if the type is not an
    /// integer.
    pub fn unwrap_int(&self) -> usize {
        match *self {
            IntType(size) => size,
            _ => panic!("unwrap_int called on {}", self),
        }
    }
}

/// Create a void type.
pub fn void_ty() -> Type {
    Type::new(VoidType)
}

/// Create an integer type of the requested size.
pub fn int_ty(size: usize) -> Type {
    assert!(size > 0, "integer types must be at least one bit wide");
    Type::new(IntType(size))
}

/// The type of block addresses.
pub fn addr_ty() -> Type {
    int_ty(64)
}
