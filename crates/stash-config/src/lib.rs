//! # Stash Config
//!
//! Configuration management for Stash.
//! Supports layered configuration from files and environment variables,
//! plus runtime refresh.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
