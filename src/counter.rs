//! Live participant counters for chat rooms.
//!
//! DESIGN
//! ======
//! One integer register per room under `CHAT_ROOM_USER_COUNT_<roomId>`.
//! Increments and decrements are single atomic store operations: Redis
//! `INCR` and a Lua script for the decrement, or a mutex-guarded map when no
//! Redis URL is configured. A missing key counts as zero.
//!
//! Decrements clamp at zero so an unmatched disconnect cannot drive the
//! count negative.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

const ROOM_COUNT_KEY_PREFIX: &str = "CHAT_ROOM_USER_COUNT_";

const CLAMPED_DECR_SCRIPT: &str = r"
local v = redis.call('DECR', KEYS[1])
if v < 0 then
    redis.call('SET', KEYS[1], 0)
    v = 0
end
return v
";

#[must_use]
pub fn room_count_key(room_id: i64) -> String {
    format!("{ROOM_COUNT_KEY_PREFIX}{room_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter store error: {0}")]
    Store(#[from] redis::RedisError),
}

impl crate::response::ErrorCode for CounterError {
    fn error_code(&self) -> &'static str {
        "E_COUNTER_STORE"
    }

    fn status(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Integer register keyed by room id.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Current count; zero when the key was never written.
    #[cfg(test)]
    async fn get(&self, room_id: i64) -> Result<i64, CounterError>;

    /// Atomically add one and return the new count.
    async fn increment(&self, room_id: i64) -> Result<i64, CounterError>;

    /// Atomically subtract one (not below zero) and return the new count.
    async fn decrement(&self, room_id: i64) -> Result<i64, CounterError>;
}

// =============================================================================
// REDIS
// =============================================================================

#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    decr: Arc<redis::Script>,
}

impl RedisCounterStore {
    /// Connect to Redis and return a store sharing one managed connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, CounterError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, decr: Arc::new(redis::Script::new(CLAMPED_DECR_SCRIPT)) })
    }
}

#[async_trait::async_trait]
impl CounterStore for RedisCounterStore {
    #[cfg(test)]
    async fn get(&self, room_id: i64) -> Result<i64, CounterError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(room_count_key(room_id)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn increment(&self, room_id: i64) -> Result<i64, CounterError> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(room_count_key(room_id), 1).await?;
        Ok(value)
    }

    async fn decrement(&self, room_id: i64) -> Result<i64, CounterError> {
        let mut conn = self.conn.clone();
        let value: i64 = self
            .decr
            .key(room_count_key(room_id))
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local counters for single-instance deployments and tests.
#[derive(Clone, Default)]
pub struct MemoryCounterStore {
    counts: Arc<Mutex<HashMap<String, i64>>>,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, room_id: i64, f: impl FnOnce(i64) -> i64) -> i64 {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let slot = counts.entry(room_count_key(room_id)).or_insert(0);
        *slot = f(*slot);
        *slot
    }
}

#[async_trait::async_trait]
impl CounterStore for MemoryCounterStore {
    #[cfg(test)]
    async fn get(&self, room_id: i64) -> Result<i64, CounterError> {
        let counts = self
            .counts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(counts
            .get(&room_count_key(room_id))
            .copied()
            .unwrap_or(0))
    }

    async fn increment(&self, room_id: i64) -> Result<i64, CounterError> {
        Ok(self.update(room_id, |n| n + 1))
    }

    async fn decrement(&self, room_id: i64) -> Result<i64, CounterError> {
        Ok(self.update(room_id, |n| (n - 1).max(0)))
    }
}

#[cfg(test)]
#[path = "counter_test.rs"]
mod tests;
