//! Cache key derivation.

use std::fmt;
use std::sync::Arc;

/// Maps a raw key to the key actually stored, before the prefix is applied.
pub type KeyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A key namespace: a prefix plus an optional key-derivation callback.
#[derive(Clone)]
pub struct Keyspace {
    prefix: String,
    key_fn: Option<KeyFn>,
}

impl Keyspace {
    /// Keys are `{prefix}{raw}`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_fn: None,
        }
    }

    /// Keys are `{prefix}{key_fn(raw)}`.
    #[must_use]
    pub fn with_key_fn(mut self, key_fn: KeyFn) -> Self {
        self.key_fn = Some(key_fn);
        self
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derives the stored key for a raw key.
    #[must_use]
    pub fn derive(&self, raw: &str) -> String {
        match &self.key_fn {
            Some(key_fn) => format!("{}{}", self.prefix, key_fn(raw)),
            None => format!("{}{}", self.prefix, raw),
        }
    }

    /// Derives every raw key, preserving order.
    #[must_use]
    pub fn derive_all(&self, raw: &[String]) -> Vec<String> {
        raw.iter().map(|key| self.derive(key)).collect()
    }
}

impl fmt::Debug for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyspace")
            .field("prefix", &self.prefix)
            .field("key_fn", &self.key_fn.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_only() {
        let keyspace = Keyspace::new("stash:cache:person:");
        assert_eq!(keyspace.derive("42"), "stash:cache:person:42");
    }

    #[test]
    fn test_key_fn() {
        let keyspace = Keyspace::new("p:").with_key_fn(Arc::new(|raw: &str| raw.to_lowercase()));
        assert_eq!(keyspace.derive("ZhangSan"), "p:zhangsan");
        assert_eq!(
            keyspace.derive_all(&["A".to_string(), "B".to_string()]),
            vec!["p:a", "p:b"]
        );
    }
}
