//! # Stash Core
//!
//! Core types, capability traits, and error definitions for Stash.
//! This crate provides the foundational abstractions shared by the cache,
//! repository and orchestration layers.

pub mod capability;
pub mod codec;
pub mod error;
pub mod lookup;
pub mod predicate;
pub mod result;
pub mod telemetry;

pub use capability::*;
pub use error::*;
pub use lookup::*;
pub use predicate::*;
pub use result::*;
