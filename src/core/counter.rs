//! Rate-limit counter store.
//!
//! The admin API counts requests per client IP in fixed windows. The
//! production implementation keeps the counters in redis so several tracker
//! processes can share them; the in-process implementation backs tests and
//! single-node setups.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;

/// Error returned by a counter store.
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A windowed counter: `incr` bumps `key` and returns the number of
/// increments seen in the current window.
#[async_trait]
pub trait Counter: Send + Sync {
    /// It increments the counter for `key` and returns its value within the
    /// current `window`.
    ///
    /// # Errors
    ///
    /// Will return an error if the backing store is unreachable.
    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CounterError>;
}

/// Counter backed by redis `INCR` with an expiry on the first increment of
/// each window.
pub struct RedisCounter {
    client: redis::Client,
}

impl RedisCounter {
    /// It connects to redis and verifies the server answers a `PING`.
    ///
    /// # Errors
    ///
    /// Will return an error if the connection cannot be established or the
    /// server does not answer the `PING`.
    pub async fn connect(host: &str, password: &str) -> Result<Self, CounterError> {
        let url = if password.is_empty() {
            format!("redis://{host}/")
        } else {
            format!("redis://:{password}@{host}/")
        };

        let client = redis::Client::open(url)?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Counter for RedisCounter {
    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CounterError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let count: u64 = conn.incr(key, 1u64).await?;

        if count == 1 {
            let seconds = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
            let _: i64 = conn.expire(key, seconds).await?;
        }

        Ok(count)
    }
}

/// In-process counter with per-key fixed windows.
#[derive(Default)]
pub struct MemoryCounter {
    windows: Mutex<HashMap<String, (Instant, u64)>>,
}

#[async_trait]
impl Counter for MemoryCounter {
    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CounterError> {
        let mut windows = self.windows.lock().expect("counter mutex poisoned");

        let now = Instant::now();
        let entry = windows.entry(key.to_string()).or_insert((now, 0));

        if now.duration_since(entry.0) >= window {
            *entry = (now, 0);
        }

        entry.1 += 1;

        Ok(entry.1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Counter, MemoryCounter};

    #[tokio::test]
    async fn it_should_count_increments_within_a_window() {
        let counter = MemoryCounter::default();

        assert_eq!(counter.incr("api:126.0.0.1", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(counter.incr("api:126.0.0.1", Duration::from_secs(60)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn counters_for_different_keys_should_be_independent() {
        let counter = MemoryCounter::default();

        counter.incr("api:126.0.0.1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(counter.incr("api:126.0.0.2", Duration::from_secs(60)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn an_expired_window_should_reset_the_count() {
        let counter = MemoryCounter::default();

        counter.incr("api:126.0.0.1", Duration::from_millis(0)).await.unwrap();

        // A zero-length window expires immediately.
        assert_eq!(counter.incr("api:126.0.0.1", Duration::from_millis(0)).await.unwrap(), 1);
    }
}
