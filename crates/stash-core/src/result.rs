//! Result type aliases for Stash.

use crate::StashError;

/// A specialized `Result` type for Stash operations.
pub type StashResult<T> = Result<T, StashError>;

/// A boxed future returning a `StashResult`.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = StashResult<T>> + Send + 'a>>;
