//! Single-record lookups.

use crate::{Key, Predicate, SqlValue, Value};

/// What to look up: the raw cache key plus the backing-store filter used on
/// a cache miss.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    key: String,
    predicate: Predicate,
}

impl Lookup {
    /// Creates a lookup from a parameter and an explicit predicate.
    #[must_use]
    pub fn new(param: impl Value, predicate: Predicate) -> Self {
        Self {
            key: param.value(),
            predicate,
        }
    }

    /// Looks up by equality on a single column; the value doubles as the key.
    #[must_use]
    pub fn by<V>(column: impl Into<String>, value: V) -> Self
    where
        V: Value + Into<SqlValue>,
    {
        let key = value.value();
        Self {
            key,
            predicate: Predicate::eq(column, value),
        }
    }

    /// Returns the raw (unprefixed) key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the backing-store predicate.
    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Value for Lookup {
    fn value(&self) -> String {
        self.key.clone()
    }
}

impl Key for Lookup {
    fn key(&self) -> String {
        self.key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by() {
        let lookup = Lookup::by("id", 42_i64);
        assert_eq!(lookup.key(), "42");
        assert_eq!(lookup.predicate(), &Predicate::eq("id", 42_i64));
    }

    #[test]
    fn test_lookup_new() {
        let lookup = Lookup::new("zhang", Predicate::like("name", "zhang%"));
        assert_eq!(lookup.value(), "zhang");
    }
}
