//! Coordination-store abstraction.
//!
//! The routing state manager ([`crate::routing`]) never talks to Redis
//! directly. It depends only on the [`CoordinationStore`] trait, which
//! exposes exactly the primitives the routing logic needs: a get/set pair
//! for the forward mapping, a pipelined write for recording an active
//! request, and the sorted-set operations the reclamation workers use to
//! age out stale entries. This mirrors how the teacher's `BackendClient`
//! hides three unrelated upstream protocols behind one small interface —
//! here the same shape hides a live Redis connection behind something that
//! can be substituted with an in-memory fake in tests.

mod error;
pub mod memory;
pub mod redis;

pub use error::{StoreError, StoreResult};

use async_trait::async_trait;

/// A capability-shaped client for the coordination store.
///
/// All methods key on a logical store key, never on a connection handle —
/// implementations own their own connection lifecycle (pooling, retries,
/// reconnect) internally.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// `GET key`. Returns `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// `SET key value EX ttl_secs`.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()>;

    /// Pipelined `SET mapping_key backend EX ttl_secs` + `ZADD set_key score member`.
    ///
    /// Both writes execute as a single round trip; a failure in either leaves
    /// no partial state observable through this trait (the underlying Redis
    /// pipeline is atomic from the client's perspective).
    async fn record_mapping(
        &self,
        mapping_key: &str,
        backend: &str,
        ttl_secs: u64,
        set_key: &str,
        member: &str,
        score: f64,
    ) -> StoreResult<()>;

    /// `ZREM set_key member`. Returns the number of members removed (0 or 1
    /// in practice, since members are unique clientIDs).
    async fn zrem(&self, set_key: &str, member: &str) -> StoreResult<u64>;

    /// `ZCOUNT set_key min max`. Counts members whose score lies in `[min, max]`.
    async fn zcount(&self, set_key: &str, min: f64, max: f64) -> StoreResult<u64>;

    /// `ZREMRANGEBYSCORE set_key min max`. Returns the number of members removed.
    async fn zremrangebyscore(&self, set_key: &str, min: f64, max: f64) -> StoreResult<u64>;

    /// `PING`. Used once at startup to fail fast if the store is unreachable.
    async fn ping(&self) -> StoreResult<()>;
}
