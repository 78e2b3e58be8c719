//! MySQL record reader.

use crate::query::{select, validate_identifier};
use crate::{DatabasePool, RecordReader};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::FromRow;
use stash_core::{Predicate, Record, StashResult};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Reads `R` rows from one table.
pub struct MySqlRecordReader<R> {
    pool: Arc<DatabasePool>,
    table: String,
    columns: Vec<String>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for MySqlRecordReader<R> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            table: self.table.clone(),
            columns: self.columns.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> MySqlRecordReader<R> {
    /// Creates a reader selecting `columns` from `table`.
    pub fn new(pool: Arc<DatabasePool>, table: &str, columns: &[&str]) -> StashResult<Self> {
        validate_identifier(table)?;
        for column in columns {
            validate_identifier(column)?;
        }

        Ok(Self {
            pool,
            table: table.to_string(),
            columns: columns.iter().map(ToString::to_string).collect(),
            _record: PhantomData,
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl<R> RecordReader<R> for MySqlRecordReader<R>
where
    R: Record + for<'r> FromRow<'r, MySqlRow> + Unpin,
{
    async fn find_one(&self, predicate: &Predicate) -> StashResult<Option<R>> {
        debug!(table = %self.table, predicate = %predicate, "Finding one record");

        let mut builder = select(&self.table, &self.columns, predicate, Some(1))?;
        let record = builder
            .build_query_as::<R>()
            .fetch_optional(self.pool.inner())
            .await?;
        Ok(record)
    }

    async fn find_many(&self, predicate: &Predicate) -> StashResult<Vec<R>> {
        debug!(table = %self.table, predicate = %predicate, "Finding records");

        let mut builder = select(&self.table, &self.columns, predicate, None)?;
        let records = builder
            .build_query_as::<R>()
            .fetch_all(self.pool.inner())
            .await?;
        Ok(records)
    }
}
