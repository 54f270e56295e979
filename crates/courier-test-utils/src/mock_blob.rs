// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory blob store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{AdapterType, BlobStore, CourierError, HealthStatus, PluginAdapter, StoredBlob};

pub const MOCK_MEDIA_BASE: &str = "http://media.test";

/// Keeps uploaded objects in a map keyed by URL.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and bytes stored at `url`.
    pub async fn get(&self, url: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().await.get(url).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory-blob"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredBlob, CourierError> {
        let mut objects = self.objects.lock().await;
        let key = format!("whatsapp-media/{}-{filename}", objects.len() + 1);
        let url = format!("{MOCK_MEDIA_BASE}/{key}");
        let size = data.len() as u64;
        objects.insert(url.clone(), (content_type.to_string(), data));
        Ok(StoredBlob { url, key, size })
    }

    async fn delete(&self, url: &str) -> Result<(), CourierError> {
        if !url.starts_with(MOCK_MEDIA_BASE) {
            return Err(CourierError::MalformedPayload(format!(
                "url `{url}` is not served by this store"
            )));
        }
        self.objects.lock().await.remove(url);
        Ok(())
    }
}
