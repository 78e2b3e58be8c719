//! MySQL implementations.

mod record_reader;

pub use record_reader::MySqlRecordReader;
