//! Capability contracts that record types opt into.
//!
//! The orchestration code is generic over [`Record`], but which narrow
//! capabilities a record actually offers is discovered through the
//! `as_*` accessors. A record that does not expose a capability needed by a
//! call path yields [`StashError::CapabilityMissing`] instead of a panic or a
//! silent no-op.

use crate::{StashError, StashResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Names of the individual capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Canonical cache key of a record.
    Key,
    /// String form of a lookup parameter.
    Value,
    /// Reversible textual encoding.
    StringRepr,
    /// "No data found" marker driving negative caching.
    IsEmpty,
    /// Ordered iteration over a collection.
    Traversable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Key => "Key",
            Self::Value => "Value",
            Self::StringRepr => "StringRepr",
            Self::IsEmpty => "IsEmpty",
            Self::Traversable => "Traversable",
        };
        f.write_str(name)
    }
}

/// The canonical cache key of a record.
pub trait Key {
    /// Returns the key, without any namespace prefix.
    fn key(&self) -> String;
}

/// The string form of a lookup parameter.
///
/// A parameter's value is compared against [`Key::key`] of decoded records
/// and is used as the raw cache and lock key of a lookup.
pub trait Value {
    /// Returns the string form.
    fn value(&self) -> String;
}

/// Marks a record that represents "no data found".
pub trait IsEmpty {
    /// Returns true if the record carries no data.
    fn is_empty(&self) -> bool;
}

/// A reversible textual encoding, used as the cache payload.
pub trait StringRepr {
    /// Encodes the record.
    fn to_repr(&self) -> StashResult<String>;

    /// Decodes `repr` into `self`, replacing its contents.
    fn parse_from(&mut self, repr: &str) -> StashResult<()>;
}

/// Ordered iteration over a collection without knowing its container type.
///
/// Implementations must visit items in construction order.
pub trait Traversable {
    /// The element type.
    type Item;

    /// Visits every item in order, stopping at the first error.
    fn traverse<'a>(
        &'a self,
        visit: &mut dyn FnMut(&'a Self::Item) -> StashResult<()>,
    ) -> StashResult<()>;
}

/// An application value that can be stored in the cache.
///
/// Payloads fall back to a structural JSON encoding when the record does not
/// expose [`StringRepr`].
pub trait Record: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Returns the [`Key`] capability, if implemented.
    fn as_key(&self) -> Option<&dyn Key> {
        None
    }

    /// Returns the [`IsEmpty`] capability, if implemented.
    fn as_is_empty(&self) -> Option<&dyn IsEmpty> {
        None
    }

    /// Returns the [`StringRepr`] capability, if implemented.
    fn as_string_repr(&self) -> Option<&dyn StringRepr> {
        None
    }

    /// Returns the mutable [`StringRepr`] capability, if implemented.
    fn as_string_repr_mut(&mut self) -> Option<&mut dyn StringRepr> {
        None
    }
}

/// Returns the record's key or a capability-missing error.
pub fn require_key<R: Record>(record: &R) -> StashResult<String> {
    record
        .as_key()
        .map(|key| key.key())
        .ok_or(StashError::CapabilityMissing(Capability::Key))
}

/// Returns whether the record is empty, or a capability-missing error.
pub fn require_is_empty<R: Record>(record: &R) -> StashResult<bool> {
    record
        .as_is_empty()
        .map(|marker| marker.is_empty())
        .ok_or(StashError::CapabilityMissing(Capability::IsEmpty))
}

/// Checks up front that a record type exposes [`IsEmpty`].
///
/// Probes a default instance so the check happens before any I/O.
pub fn ensure_is_empty<R: Record>() -> StashResult<()> {
    require_is_empty(&R::default()).map(|_| ())
}

/// Collects the string form of every item of a parameter collection.
pub fn collect_values<P>(params: &P) -> StashResult<Vec<String>>
where
    P: Traversable + ?Sized,
    P::Item: Value,
{
    let mut values = Vec::new();
    params.traverse(&mut |item| {
        values.push(item.value());
        Ok(())
    })?;
    Ok(values)
}

impl<T> Traversable for Vec<T> {
    type Item = T;

    fn traverse<'a>(
        &'a self,
        visit: &mut dyn FnMut(&'a Self::Item) -> StashResult<()>,
    ) -> StashResult<()> {
        self.as_slice().traverse(visit)
    }
}

impl<T> Traversable for [T] {
    type Item = T;

    fn traverse<'a>(
        &'a self,
        visit: &mut dyn FnMut(&'a Self::Item) -> StashResult<()>,
    ) -> StashResult<()> {
        for item in self {
            visit(item)?;
        }
        Ok(())
    }
}

impl<R: Record> IsEmpty for Vec<R> {
    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<R: Record> Record for Vec<R> {
    fn as_is_empty(&self) -> Option<&dyn IsEmpty> {
        Some(self)
    }
}

impl Value for String {
    fn value(&self) -> String {
        self.clone()
    }
}

impl Value for str {
    fn value(&self) -> String {
        self.to_string()
    }
}

impl<T: Value + ?Sized> Value for &T {
    fn value(&self) -> String {
        (**self).value()
    }
}

macro_rules! impl_value_for_display {
    ($($ty:ty),*) => {
        $(
            impl Value for $ty {
                fn value(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_value_for_display!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);
