// Copyright (c) 2017-2021 Fabian Schuiki

//! Primary and secondary tables.
//!
//! This module implements primary tables which are used to associate some data
//! with a dense, opaque, integer id; and secondary tables which are used to
//! associate additional data with the primary table.
//!
//! Keys handed out by a primary table are never reused. Removing an entry
//! leaves a hole behind, such that stale keys fail loudly on lookup instead of
//! silently aliasing a newer entry.

use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// An opaque key to uniquely identify a table entry.
pub trait TableKey: Copy {
    /// Create a new table key from an index.
    fn new(index: usize) -> Self;
    /// Return the index wrapped within this table key.
    fn index(self) -> usize;
}

/// Generate a new opaque table key struct.
#[macro_export]
macro_rules! impl_table_key {
    ($($(#[$m:meta])* struct $name:ident($ity:ty) as $display_prefix:expr;)*) => {
        $(
            $(#[$m])*
            #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name($ity);

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{}{}", $display_prefix, self.0)
                }
            }

            impl std::fmt::Debug for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{}", self)
                }
            }

            impl $crate::table::TableKey for $name {
                fn new(index: usize) -> Self {
                    $name(index as $ity)
                }

                fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

/// Generate the `Index` and `IndexMut` operations for a contained table.
#[macro_export]
macro_rules! impl_table_indexing {
    ($target:path, $($field:ident).+, $key:ty, $value:ty) => {
        impl std::ops::Index<$key> for $target {
            type Output = $value;

            fn index(&self, idx: $key) -> &$value {
                &self.$($field).*[idx]
            }
        }

        impl std::ops::IndexMut<$key> for $target {
            fn index_mut(&mut self, idx: $key) -> &mut $value {
                &mut self.$($field).*[idx]
            }
        }
    };
}

/// A primary table that provides dense key-based storage.
#[derive(Clone, Debug)]
pub struct PrimaryTable<I, V> {
    storage: Vec<Option<V>>,
    len: usize,
    unused: PhantomData<I>,
}

impl<I, V> PrimaryTable<I, V> {
    /// Create a new primary table.
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
            len: 0,
            unused: PhantomData,
        }
    }

    /// Return the number of live entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether the table has no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the number of keys ever handed out by the table.
    ///
    /// All keys of the table have an index below this capacity.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }
}

impl<I, V> Default for PrimaryTable<I, V> {
    fn default() -> PrimaryTable<I, V> {
        PrimaryTable::new()
    }
}

impl<I: TableKey, V> PrimaryTable<I, V> {
    /// Add a new entry to the table.
    ///
    /// Returns the key under which the entry can be accessed again.
    pub fn add(&mut self, value: V) -> I {
        let index = self.storage.len();
        self.storage.push(Some(value));
        self.len += 1;
        I::new(index)
    }

    /// Remove an entry from the table.
    ///
    /// Panics if the entry does not exist.
    pub fn remove(&mut self, key: I) -> V {
        let value = self
            .storage
            .get_mut(key.index())
            .and_then(Option::take)
            .expect("key not in table");
        self.len -= 1;
        value
    }

    /// Check whether an entry exists in the table.
    pub fn contains(&self, key: I) -> bool {
        self.get(key).is_some()
    }

    /// Get an entry from the table, if it exists.
    pub fn get(&self, key: I) -> Option<&V> {
        self.storage.get(key.index()).and_then(Option::as_ref)
    }

    /// Get a mutable entry from the table, if it exists.
    pub fn get_mut(&mut self, key: I) -> Option<&mut V> {
        self.storage.get_mut(key.index()).and_then(Option::as_mut)
    }

    /// Return an iterator over the keys and values in the table.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = (I, &'a V)> + 'a {
        self.storage
            .iter()
            .enumerate()
            .flat_map(|(k, v)| v.as_ref().map(|v| (I::new(k), v)))
    }

    /// Return an iterator over the keys in the table.
    pub fn keys<'a>(&'a self) -> impl Iterator<Item = I> + 'a {
        self.iter().map(|(k, _)| k)
    }

    /// Return an iterator over the values in the table.
    pub fn values<'a>(&'a self) -> impl Iterator<Item = &'a V> + 'a {
        self.storage.iter().flatten()
    }

    /// Return an iterator over mutable references to the values in the table.
    pub fn values_mut<'a>(&'a mut self) -> impl Iterator<Item = &'a mut V> + 'a {
        self.storage.iter_mut().flatten()
    }
}

impl<I: TableKey, V> Index<I> for PrimaryTable<I, V> {
    type Output = V;

    fn index(&self, idx: I) -> &V {
        self.get(idx).expect("key not in table")
    }
}

impl<I: TableKey, V> IndexMut<I> for PrimaryTable<I, V> {
    fn index_mut(&mut self, idx: I) -> &mut V {
        self.get_mut(idx).expect("key not in table")
    }
}

/// A secondary table that associates additional information with entries in a
/// primary table.
#[derive(Clone, Debug)]
pub struct SecondaryTable<I, V> {
    storage: Vec<Option<V>>,
    unused: PhantomData<I>,
}

impl<I, V> SecondaryTable<I, V> {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
            unused: PhantomData,
        }
    }
}

impl<I: TableKey, V> SecondaryTable<I, V> {
    /// Add an entry to the table.
    ///
    /// The user must provide the key with which the information is associated.
    pub fn add(&mut self, key: I, value: V) {
        let index = key.index();
        if index >= self.storage.len() {
            self.storage.resize_with(index + 1, || None);
        }
        if self.storage[index].replace(value).is_some() {
            panic!("key already in table");
        }
    }

    /// Remove an entry from the table.
    pub fn remove(&mut self, key: I) -> Option<V> {
        self.storage.get_mut(key.index()).and_then(Option::take)
    }

    /// Check whether an entry exists in the table.
    pub fn contains(&self, key: I) -> bool {
        self.get(key).is_some()
    }

    /// Get an entry from the table, if one exists.
    pub fn get(&self, key: I) -> Option<&V> {
        self.storage.get(key.index()).and_then(Option::as_ref)
    }

    /// Get a mutable entry from the table, if one exists.
    pub fn get_mut(&mut self, key: I) -> Option<&mut V> {
        self.storage.get_mut(key.index()).and_then(Option::as_mut)
    }
}

impl<I, V> Default for SecondaryTable<I, V> {
    fn default() -> SecondaryTable<I, V> {
        SecondaryTable::new()
    }
}

impl<I: TableKey, V> Index<I> for SecondaryTable<I, V> {
    type Output = V;

    fn index(&self, idx: I) -> &V {
        self.get(idx).expect("key not in secondary table")
    }
}

impl<I: TableKey, V> IndexMut<I> for SecondaryTable<I, V> {
    fn index_mut(&mut self, idx: I) -> &mut V {
        self.get_mut(idx).expect("key not in secondary table")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl_table_key! {
        struct Key(u32) as "k";
    }

    #[test]
    fn removed_keys_are_not_reused() {
        let mut tbl = PrimaryTable::<Key, &str>::new();
        let a = tbl.add("a");
        let b = tbl.add("b");
        assert_eq!(tbl.remove(a), "a");
        let c = tbl.add("c");
        assert_ne!(a, c);
        assert!(!tbl.contains(a));
        assert_eq!(tbl[b], "b");
        assert_eq!(tbl.len(), 2);
        assert_eq!(tbl.keys().collect::<Vec<_>>(), vec![b, c]);
    }

    #[test]
    #[should_panic(expected = "key not in table")]
    fn stale_key_panics() {
        let mut tbl = PrimaryTable::<Key, u8>::new();
        let a = tbl.add(1);
        tbl.remove(a);
        let _ = tbl[a];
    }

    #[test]
    fn secondary_table_grows_on_demand() {
        let mut tbl = SecondaryTable::<Key, u8>::new();
        tbl.add(Key::new(5), 42);
        assert!(tbl.contains(Key::new(5)));
        assert!(!tbl.contains(Key::new(2)));
        assert_eq!(tbl.remove(Key::new(5)), Some(42));
        assert_eq!(tbl.get(Key::new(5)), None);
    }
}
