// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store access with a coherent read-through cache.
//!
//! Every write goes to the store first. The cache is only touched once the
//! store call has returned, and cache failures never fail the operation.

use std::sync::Arc;

use courier_core::{
    CacheLookup, ChatSession, CourierError, Message, MessageCache, MessageStore, StatusOutcome,
    StatusUpdate, UpsertMode, UpsertOutcome, User, UserProfile,
};
use tracing::{debug, warn};

/// Largest page served by list operations.
pub const MAX_PAGE_SIZE: u32 = 200;

/// The store and cache behind one handle.
#[derive(Clone)]
pub struct MessageRepository {
    store: Arc<dyn MessageStore>,
    cache: Arc<dyn MessageCache>,
}

impl MessageRepository {
    pub fn new(store: Arc<dyn MessageStore>, cache: Arc<dyn MessageCache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn MessageCache> {
        &self.cache
    }

    /// Cache-aside read by internal id.
    pub async fn get(&self, id: &str) -> Result<Option<Message>, CourierError> {
        let token = match self.cache.lookup(id).await {
            Ok(CacheLookup::Hit(message)) => {
                courier_prometheus::record_cache_lookup("hit");
                return Ok(Some(message));
            }
            Ok(CacheLookup::Miss(token)) => {
                courier_prometheus::record_cache_lookup("miss");
                Some(token)
            }
            Err(e) => {
                courier_prometheus::record_cache_lookup("error");
                warn!(message_id = %id, error = %e, "cache lookup failed, reading store");
                None
            }
        };

        let message = self.store.get_message(id).await?;
        if let (Some(message), Some(token)) = (&message, token) {
            match self.cache.fill(message, token).await {
                Ok(true) => {}
                Ok(false) => debug!(message_id = %id, "cache fill dropped after invalidation"),
                Err(e) => warn!(message_id = %id, error = %e, "cache fill failed"),
            }
        }
        Ok(message)
    }

    pub async fn get_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Message>, CourierError> {
        self.store.get_message_by_provider_id(provider_id).await
    }

    /// Persist a message, then bring the cache in line with the result.
    ///
    /// New rows are written through; merged rows are invalidated.
    pub async fn record(
        &self,
        message: &Message,
        mode: UpsertMode,
    ) -> Result<UpsertOutcome, CourierError> {
        let outcome = self.store.upsert_message(message, mode).await?;
        match &outcome {
            UpsertOutcome::Inserted(stored) => {
                if let Err(e) = self.cache.put(stored).await {
                    warn!(message_id = %stored.id, error = %e, "cache write-through failed");
                }
            }
            UpsertOutcome::Merged(stored) => self.invalidate(&stored.id).await,
            UpsertOutcome::Existing(_) => {}
        }
        Ok(outcome)
    }

    /// Reconcile and persist a status update, then invalidate the cache entry.
    pub async fn apply_status(&self, update: &StatusUpdate) -> Result<StatusOutcome, CourierError> {
        let outcome = self.store.apply_status(update).await?;
        courier_prometheus::record_status_update(outcome.label());

        match &outcome {
            StatusOutcome::Applied {
                id,
                previous,
                current,
            } => {
                debug!(
                    message_id = %id,
                    provider_id = %update.provider_id,
                    from = %previous,
                    to = %current,
                    "status applied"
                );
                self.invalidate(id).await;
            }
            StatusOutcome::Ignored {
                id,
                current,
                reason,
            } => {
                debug!(
                    message_id = %id,
                    provider_id = %update.provider_id,
                    current = %current,
                    reported = %update.status,
                    reason = ?reason,
                    "status update ignored"
                );
            }
            StatusOutcome::UnknownMessage => {
                warn!(
                    provider_id = %update.provider_id,
                    status = %update.raw_status,
                    "status update for unknown message"
                );
                // A stale entry may still be indexed under the provider id.
                if let Err(e) = self.cache.invalidate_provider_id(&update.provider_id).await {
                    warn!(provider_id = %update.provider_id, error = %e, "cache invalidation failed");
                }
            }
        }
        Ok(outcome)
    }

    async fn invalidate(&self, id: &str) {
        if let Err(e) = self.cache.invalidate(id).await {
            warn!(message_id = %id, error = %e, "cache invalidation failed");
        }
    }

    /// Messages for one participant, or the most recent ones overall.
    ///
    /// `limit` is capped at [`MAX_PAGE_SIZE`]; `offset` only applies to
    /// participant listings.
    pub async fn list(
        &self,
        participant: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, CourierError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        match participant {
            Some(address) => self.store.list_by_participant(address, limit, offset).await,
            None => self.store.list_recent(limit).await,
        }
    }

    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<User, CourierError> {
        self.store.upsert_user(profile).await
    }

    pub async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, CourierError> {
        self.store.get_user_by_phone(phone).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, CourierError> {
        self.store.get_session(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use courier_cache::MemoryCache;
    use courier_config::model::{CacheConfig, StorageConfig};
    use courier_core::{
        AdapterType, Direction, FillToken, HealthStatus, MessageStatus, PluginAdapter,
        model::now_millis,
    };
    use courier_storage::{Database, SqliteStore};

    /// A cache backend that is down for every call.
    struct UnreachableCache;

    fn refused() -> CourierError {
        CourierError::Cache {
            message: "connection refused".into(),
        }
    }

    #[async_trait]
    impl PluginAdapter for UnreachableCache {
        fn name(&self) -> &str {
            "unreachable"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Cache
        }

        async fn health_check(&self) -> Result<HealthStatus, CourierError> {
            Ok(HealthStatus::Unhealthy("connection refused".into()))
        }

        async fn shutdown(&self) -> Result<(), CourierError> {
            Ok(())
        }
    }

    #[async_trait]
    impl MessageCache for UnreachableCache {
        async fn lookup(&self, _id: &str) -> Result<CacheLookup, CourierError> {
            Err(refused())
        }

        async fn fill(&self, _message: &Message, _token: FillToken) -> Result<bool, CourierError> {
            Err(refused())
        }

        async fn put(&self, _message: &Message) -> Result<(), CourierError> {
            Err(refused())
        }

        async fn invalidate(&self, _id: &str) -> Result<(), CourierError> {
            Err(refused())
        }

        async fn invalidate_provider_id(&self, _provider_id: &str) -> Result<bool, CourierError> {
            Err(refused())
        }
    }

    async fn repository() -> (MessageRepository, Arc<MemoryCache>) {
        let db = Database::open_in_memory().await.unwrap();
        let store = Arc::new(SqliteStore::from_database(StorageConfig::default(), db));
        let cache = Arc::new(MemoryCache::new(&CacheConfig::default()));
        (MessageRepository::new(store, cache.clone()), cache)
    }

    fn inbound(provider_id: &str) -> Message {
        let mut m = Message::new(
            Direction::Inbound,
            provider_id,
            "whatsapp:+15550001111",
            "whatsapp:+14155238886",
        );
        m.status = MessageStatus::Delivered;
        m.content = "hello".into();
        m
    }

    fn outbound(provider_id: &str) -> Message {
        let mut m = Message::new(
            Direction::Outbound,
            provider_id,
            "whatsapp:+14155238886",
            "whatsapp:+15550001111",
        );
        m.status = MessageStatus::Sent;
        m
    }

    fn update(provider_id: &str, raw: &str) -> StatusUpdate {
        StatusUpdate::from_provider(provider_id, raw, None, None, now_millis())
    }

    #[tokio::test]
    async fn new_messages_are_written_through() {
        let (repo, cache) = repository().await;
        let message = inbound("SM1");
        repo.record(&message, UpsertMode::Create).await.unwrap();

        assert!(matches!(
            cache.lookup(&message.id).await.unwrap(),
            CacheLookup::Hit(_)
        ));
    }

    #[tokio::test]
    async fn miss_fills_from_store() {
        let (repo, cache) = repository().await;
        let message = inbound("SM2");
        repo.record(&message, UpsertMode::Create).await.unwrap();
        cache.invalidate(&message.id).await.unwrap();

        let fetched = repo.get(&message.id).await.unwrap().unwrap();
        assert_eq!(fetched.provider_id, "SM2");
        assert!(matches!(
            cache.lookup(&message.id).await.unwrap(),
            CacheLookup::Hit(_)
        ));
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_update_is_visible_through_cache() {
        let (repo, _cache) = repository().await;
        let message = outbound("SM3");
        repo.record(&message, UpsertMode::Acknowledge).await.unwrap();
        assert_eq!(
            repo.get(&message.id).await.unwrap().unwrap().status,
            MessageStatus::Sent
        );

        let outcome = repo.apply_status(&update("SM3", "delivered")).await.unwrap();
        assert!(matches!(outcome, StatusOutcome::Applied { .. }));
        assert_eq!(
            repo.get(&message.id).await.unwrap().unwrap().status,
            MessageStatus::Delivered
        );
    }

    #[tokio::test]
    async fn late_status_is_ignored() {
        let (repo, _cache) = repository().await;
        let message = outbound("SM4");
        repo.record(&message, UpsertMode::Acknowledge).await.unwrap();
        repo.apply_status(&update("SM4", "delivered")).await.unwrap();

        let outcome = repo.apply_status(&update("SM4", "sent")).await.unwrap();
        assert!(matches!(outcome, StatusOutcome::Ignored { .. }));
        assert_eq!(
            repo.get(&message.id).await.unwrap().unwrap().status,
            MessageStatus::Delivered
        );
    }

    #[tokio::test]
    async fn unknown_message_is_reported_not_failed() {
        let (repo, _cache) = repository().await;
        let outcome = repo.apply_status(&update("SMnope", "read")).await.unwrap();
        assert_eq!(outcome, StatusOutcome::UnknownMessage);
    }

    #[tokio::test]
    async fn list_caps_page_size() {
        let (repo, _cache) = repository().await;
        for i in 0..3 {
            repo.record(&inbound(&format!("SM-L{i}")), UpsertMode::Create)
                .await
                .unwrap();
        }
        assert_eq!(repo.list(None, 10_000, 0).await.unwrap().len(), 3);
        assert_eq!(
            repo.list(Some("whatsapp:+15550001111"), 2, 0)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            repo.list(Some("whatsapp:+15550001111"), 2, 2)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn cache_outage_falls_through_to_store() {
        let db = Database::open_in_memory().await.unwrap();
        let store = Arc::new(SqliteStore::from_database(StorageConfig::default(), db));
        let repo = MessageRepository::new(store, Arc::new(UnreachableCache));

        let message = outbound("SM5");
        repo.record(&message, UpsertMode::Acknowledge).await.unwrap();
        let fetched = repo.get(&message.id).await.unwrap().unwrap();
        assert_eq!(fetched.provider_id, "SM5");

        let outcome = repo.apply_status(&update("SM5", "delivered")).await.unwrap();
        assert!(matches!(outcome, StatusOutcome::Applied { .. }));
        assert_eq!(
            repo.get(&message.id).await.unwrap().unwrap().status,
            MessageStatus::Delivered
        );
        assert_eq!(
            repo.apply_status(&update("SMnope", "read")).await.unwrap(),
            StatusOutcome::UnknownMessage
        );
    }
}
