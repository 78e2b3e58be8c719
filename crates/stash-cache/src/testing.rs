//! Test doubles.

use crate::KeyValueStore;
use async_trait::async_trait;
use mockall::mock;
use stash_core::StashResult;
use std::time::Duration;

mock! {
    pub Store {}

    #[async_trait]
    impl KeyValueStore for Store {
        async fn get(&self, key: &str) -> StashResult<Option<String>>;
        async fn get_many(&self, keys: &[String]) -> StashResult<Vec<Option<String>>>;
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> StashResult<()>;
        async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> StashResult<()>;
        async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StashResult<bool>;
        async fn delete(&self, keys: &[String]) -> StashResult<u64>;
    }
}
