// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory message cache with TTL expiry and a background sweeper.
//!
//! Entries are keyed by internal id. A secondary index maps provider id to
//! internal id so status callbacks can invalidate without a store round trip.
//!
//! Every invalidation takes a number from a global sequence and records it
//! against the id. A miss hands out the current sequence as its
//! [`FillToken`]; a fill is accepted only if no invalidation of the same id
//! happened after the token was issued. The check and the insert happen under
//! the entry's shard lock, and invalidation records its mark before taking
//! that lock, so a fill can never land after an invalidation it raced with.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use courier_config::model::CacheConfig;
use courier_core::{
    AdapterType, CacheLookup, CourierError, FillToken, HealthStatus, Message, MessageCache,
    PluginAdapter,
};

#[derive(Debug, Clone)]
struct CacheEntry {
    message: Message,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(message: Message, ttl: Duration) -> Self {
        Self {
            message,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

struct Mark {
    seq: u64,
    at: Instant,
}

struct Inner {
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<String, CacheEntry>,
    by_provider_id: DashMap<String, String>,
    marks: DashMap<String, Mark>,
    seq: AtomicU64,
    /// Tokens below this value are rejected because their marks were pruned.
    floor: AtomicU64,
}

impl Inner {
    fn insert(&self, message: &Message) -> bool {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&message.id) {
            debug!(message_id = %message.id, "cache full, skipping insert");
            return false;
        }
        self.entries.insert(
            message.id.clone(),
            CacheEntry::new(message.clone(), self.ttl),
        );
        self.by_provider_id
            .insert(message.provider_id.clone(), message.id.clone());
        true
    }

    fn invalidate(&self, id: &str) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.marks.insert(
            id.to_string(),
            Mark {
                seq,
                at: Instant::now(),
            },
        );
        if let Some((_, entry)) = self.entries.remove(id) {
            self.by_provider_id
                .remove_if(&entry.message.provider_id, |_, mapped| mapped == id);
        }
    }

    fn fill(&self, message: &Message, token: FillToken) -> bool {
        if token.0 < self.floor.load(Ordering::SeqCst) {
            return false;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&message.id) {
            return false;
        }
        match self.entries.entry(message.id.clone()) {
            Entry::Occupied(_) => return true,
            Entry::Vacant(vacant) => {
                let invalidated_since = self
                    .marks
                    .get(&message.id)
                    .is_some_and(|mark| mark.seq > token.0);
                if invalidated_since {
                    return false;
                }
                vacant.insert(CacheEntry::new(message.clone(), self.ttl));
            }
        }
        // Indexed after the shard lock is released; a dangling index entry is harmless.
        self.by_provider_id
            .insert(message.provider_id.clone(), message.id.clone());
        true
    }

    /// Drop expired entries and invalidation marks older than `mark_retention`.
    fn sweep(&self, mark_retention: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        self.by_provider_id
            .retain(|_, id| self.entries.contains_key(id.as_str()));

        let cutoff = Instant::now().checked_sub(mark_retention);
        if let Some(cutoff) = cutoff {
            let mut pruned_max = 0;
            self.marks.retain(|_, mark| {
                if mark.at < cutoff {
                    pruned_max = pruned_max.max(mark.seq);
                    false
                } else {
                    true
                }
            });
            self.floor.fetch_max(pruned_max, Ordering::SeqCst);
        }

        before.saturating_sub(self.entries.len())
    }
}

/// Process-local [`MessageCache`].
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Inner>,
    cleanup_interval: Duration,
    cancel: CancellationToken,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl: Duration::from_secs(config.ttl_secs),
                max_entries: config.max_entries.max(1),
                entries: DashMap::new(),
                by_provider_id: DashMap::new(),
                marks: DashMap::new(),
                seq: AtomicU64::new(0),
                floor: AtomicU64::new(0),
            }),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the background sweeper. It stops when the cache is shut down.
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let cancel = self.cancel.clone();
        let interval = self.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = inner.sweep(interval);
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                    _ = cancel.cancelled() => {
                        debug!("cache cleanup task stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Number of live and not-yet-swept entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        if self.inner.entries.len() >= self.inner.max_entries {
            return Ok(HealthStatus::Degraded("cache at capacity".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        self.cancel.cancel();
        Ok(())
    }
}

#[async_trait]
impl MessageCache for MemoryCache {
    async fn lookup(&self, id: &str) -> Result<CacheLookup, CourierError> {
        // Read the sequence first: a token never postdates the lookup.
        let token = FillToken(self.inner.seq.load(Ordering::SeqCst));
        let hit = self.inner.entries.get(id).map(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.message.clone())
            }
        });
        match hit {
            Some(Some(message)) => Ok(CacheLookup::Hit(message)),
            Some(None) => {
                self.inner
                    .entries
                    .remove_if(id, |_, entry| entry.is_expired());
                Ok(CacheLookup::Miss(token))
            }
            None => Ok(CacheLookup::Miss(token)),
        }
    }

    async fn fill(&self, message: &Message, token: FillToken) -> Result<bool, CourierError> {
        Ok(self.inner.fill(message, token))
    }

    async fn put(&self, message: &Message) -> Result<(), CourierError> {
        self.inner.insert(message);
        Ok(())
    }

    async fn invalidate(&self, id: &str) -> Result<(), CourierError> {
        self.inner.invalidate(id);
        Ok(())
    }

    async fn invalidate_provider_id(&self, provider_id: &str) -> Result<bool, CourierError> {
        match self.inner.by_provider_id.remove(provider_id) {
            Some((_, id)) => {
                self.inner.invalidate(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Direction;

    fn config(ttl_secs: u64, max_entries: usize) -> CacheConfig {
        CacheConfig {
            ttl_secs,
            max_entries,
            cleanup_interval_secs: 1,
        }
    }

    fn message(provider_id: &str) -> Message {
        Message::new(Direction::Inbound, provider_id, "whatsapp:+1", "whatsapp:+2")
    }

    fn token_of(lookup: CacheLookup) -> FillToken {
        match lookup {
            CacheLookup::Miss(token) => token,
            CacheLookup::Hit(m) => panic!("unexpected hit for {}", m.id),
        }
    }

    #[tokio::test]
    async fn put_then_lookup_hits() {
        let cache = MemoryCache::new(&config(60, 10));
        let msg = message("SM1");
        cache.put(&msg).await.unwrap();
        assert_eq!(cache.lookup(&msg.id).await.unwrap(), CacheLookup::Hit(msg));
    }

    #[tokio::test]
    async fn miss_then_fill_then_hit() {
        let cache = MemoryCache::new(&config(60, 10));
        let msg = message("SM1");
        let token = token_of(cache.lookup(&msg.id).await.unwrap());
        assert!(cache.fill(&msg, token).await.unwrap());
        assert!(matches!(
            cache.lookup(&msg.id).await.unwrap(),
            CacheLookup::Hit(_)
        ));
    }

    #[tokio::test]
    async fn fill_after_racing_invalidation_is_dropped() {
        let cache = MemoryCache::new(&config(60, 10));
        let stale = message("SM1");
        // Reader misses and goes to the store.
        let token = token_of(cache.lookup(&stale.id).await.unwrap());
        // Writer updates the store and invalidates before the reader fills.
        cache.invalidate(&stale.id).await.unwrap();
        assert!(!cache.fill(&stale, token).await.unwrap());
        assert!(matches!(
            cache.lookup(&stale.id).await.unwrap(),
            CacheLookup::Miss(_)
        ));
    }

    #[tokio::test]
    async fn fill_after_earlier_invalidation_is_accepted() {
        let cache = MemoryCache::new(&config(60, 10));
        let msg = message("SM1");
        cache.invalidate(&msg.id).await.unwrap();
        let token = token_of(cache.lookup(&msg.id).await.unwrap());
        assert!(cache.fill(&msg, token).await.unwrap());
    }

    #[tokio::test]
    async fn invalidate_by_provider_id_uses_index() {
        let cache = MemoryCache::new(&config(60, 10));
        let msg = message("SM7");
        cache.put(&msg).await.unwrap();

        assert!(cache.invalidate_provider_id("SM7").await.unwrap());
        assert!(matches!(
            cache.lookup(&msg.id).await.unwrap(),
            CacheLookup::Miss(_)
        ));
        assert!(!cache.invalidate_provider_id("SM7").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new(&config(5, 10));
        let msg = message("SM1");
        cache.put(&msg).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(matches!(
            cache.lookup(&msg.id).await.unwrap(),
            CacheLookup::Miss(_)
        ));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_removes_expired_entries() {
        let cache = MemoryCache::new(&config(2, 10));
        let handle = cache.spawn_cleanup();
        cache.put(&message("SM1")).await.unwrap();
        cache.put(&message("SM2")).await.unwrap();
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(cache.len(), 0);

        cache.shutdown().await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pruned_marks_reject_older_tokens() {
        let cache = MemoryCache::new(&config(60, 10));
        let msg = message("SM1");
        let token = token_of(cache.lookup(&msg.id).await.unwrap());
        cache.invalidate(&msg.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.inner.sweep(Duration::from_secs(1));
        assert!(cache.inner.marks.is_empty());
        assert!(!cache.fill(&msg, token).await.unwrap());
    }

    #[tokio::test]
    async fn capacity_bounds_new_entries() {
        let cache = MemoryCache::new(&config(60, 1));
        cache.put(&message("SM1")).await.unwrap();
        let second = message("SM2");
        cache.put(&second).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert!(matches!(
            cache.lookup(&second.id).await.unwrap(),
            CacheLookup::Miss(_)
        ));
        assert!(matches!(
            cache.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
