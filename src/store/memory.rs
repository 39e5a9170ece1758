//! In-memory [`CoordinationStore`] fake for tests.
//!
//! Mirrors the semantics of the real Redis primitives closely enough that
//! the routing state manager's tests exercise the same code paths they
//! would against a live store, without needing one running. Shaped like
//! the teacher's in-process test doubles — a `tokio::sync::Mutex`-guarded
//! map, nothing more.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CoordinationStore, StoreResult};

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
}

/// An in-memory stand-in for Redis, good enough for unit tests.
///
/// TTLs on string keys are not enforced — nothing in the routing logic
/// reads an expired forward mapping as if it were absent within a single
/// test, so this fake simply never expires them.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directly seed a sorted-set member/score pair, bypassing `record_mapping`.
    ///
    /// Used by tests that need to pre-populate backend load without also
    /// writing a forward mapping.
    pub async fn seed_zset(&self, set_key: &str, member: &str, score: f64) {
        let mut inner = self.inner.lock().await;
        inner
            .sorted_sets
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string(), score);
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.strings.get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl_secs: u64) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn record_mapping(
        &self,
        mapping_key: &str,
        backend: &str,
        _ttl_secs: u64,
        set_key: &str,
        member: &str,
        score: f64,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.strings.insert(mapping_key.to_string(), backend.to_string());
        inner
            .sorted_sets
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrem(&self, set_key: &str, member: &str) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let removed = inner
            .sorted_sets
            .get_mut(set_key)
            .and_then(|set| set.remove(member))
            .is_some();
        Ok(removed as u64)
    }

    async fn zcount(&self, set_key: &str, min: f64, max: f64) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        let count = inner
            .sorted_sets
            .get(set_key)
            .map(|set| set.values().filter(|&&score| score >= min && score <= max).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn zremrangebyscore(&self, set_key: &str, min: f64, max: f64) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let Some(set) = inner.sorted_sets.get_mut(set_key) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|_, &mut score| !(score >= min && score <= max));
        Ok((before - set.len()) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
