//! Redis-backed [`CoordinationStore`].
//!
//! Connects once at construction time via [`redis::aio::ConnectionManager`],
//! which transparently reconnects on transport errors, so callers never see
//! a "connection dropped" failure mode distinct from any other store error.
//!
//! TLS is always negotiated when `redis_url` uses the `rediss://` scheme.
//! Certificate verification is intentionally skipped — the `tls-rustls-insecure`
//! Cargo feature makes every `rediss://` connection from this client accept
//! an unverified certificate, which is a known weakening carried over from
//! the system this router replaces (see `DESIGN.md`).

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{CoordinationStore, StoreError, StoreResult};

pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Open a connection manager against `redis_url` and verify it is reachable.
    ///
    /// This performs the startup `PING` the process relies on to fail fast —
    /// callers should treat an `Err` here as fatal to process startup.
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Backend(format!("invalid REDIS_URL: {e}")))?;
        let conn = client.get_connection_manager().await?;
        let store = Self { conn };
        store.ping().await?;
        Ok(store)
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn record_mapping(
        &self,
        mapping_key: &str,
        backend: &str,
        ttl_secs: u64,
        set_key: &str,
        member: &str,
        score: f64,
    ) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .set_ex(mapping_key, backend, ttl_secs)
            .ignore()
            .zadd(set_key, member, score)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn zrem(&self, set_key: &str, member: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.zrem(set_key, member).await?;
        Ok(removed)
    }

    async fn zcount(&self, set_key: &str, min: f64, max: f64) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.zcount(set_key, min, max).await?;
        Ok(count)
    }

    async fn zremrangebyscore(&self, set_key: &str, min: f64, max: f64) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.zrembyscore(set_key, min, max).await?;
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
