// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the MessageStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::{
    AdapterType, ChatSession, CourierError, HealthStatus, Message, MessageStore, PluginAdapter,
    StatusOutcome, StatusUpdate, UpsertMode, UpsertOutcome, User, UserProfile,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed message store.
///
/// The database is opened on the first call to [`MessageStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new store. The database is not opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, CourierError> {
        self.db.get().ok_or_else(|| CourierError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Record a chat session. The orchestrator owns session lifecycle.
    pub async fn insert_session(&self, session: &ChatSession) -> Result<(), CourierError> {
        queries::sessions::insert_session(self.db()?, session).await
    }

    async fn checkpoint(&self) -> Result<(), CourierError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn initialize(&self) -> Result<(), CourierError> {
        let db = Database::open_with_wal(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CourierError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CourierError> {
        self.db()?;
        self.checkpoint().await
    }

    async fn upsert_message(
        &self,
        message: &Message,
        mode: UpsertMode,
    ) -> Result<UpsertOutcome, CourierError> {
        queries::messages::upsert_message(self.db()?, message, mode).await
    }

    async fn apply_status(&self, update: &StatusUpdate) -> Result<StatusOutcome, CourierError> {
        queries::messages::apply_status(self.db()?, update).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, CourierError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn get_message_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Message>, CourierError> {
        queries::messages::get_message_by_provider_id(self.db()?, provider_id).await
    }

    async fn list_by_participant(
        &self,
        address: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, CourierError> {
        queries::messages::list_by_participant(self.db()?, address, limit, offset).await
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Message>, CourierError> {
        queries::messages::list_recent(self.db()?, limit).await
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, CourierError> {
        queries::users::upsert_user(self.db()?, profile).await
    }

    async fn get_user_by_phone(&self, phone_number: &str) -> Result<Option<User>, CourierError> {
        queries::users::get_user_by_phone(self.db()?, phone_number).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, CourierError> {
        queries::sessions::get_session(self.db()?, id).await
    }
}
