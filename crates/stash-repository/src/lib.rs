//! # Stash Repository
//!
//! The system of record behind the cache:
//!
//! ```text
//! Orchestrator
//!   ↓  Arc<dyn RecordReader<R>>   (backing-store contract)
//! MySqlRecordReader<R>            (predicate → bound SELECT)
//!   ↓
//! MySQL
//! ```

pub mod mysql;
pub mod pool;
pub mod query;
pub mod traits;

pub use mysql::*;
pub use pool::*;
pub use traits::*;
