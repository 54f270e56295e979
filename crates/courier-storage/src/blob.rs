// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem blob store for uploaded media.
//!
//! Objects live under `root_dir` at `whatsapp-media/YYYY/MM/DD/<uuid><ext>`
//! and are served by an external static file server at `public_base_url`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use courier_config::model::MediaConfig;
use courier_core::{AdapterType, BlobStore, CourierError, HealthStatus, PluginAdapter, StoredBlob};

const KEY_PREFIX: &str = "whatsapp-media";

pub struct FsBlobStore {
    root_dir: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&config.root_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_key(filename: &str, content_type: &str) -> String {
        let date = chrono::Utc::now().format("%Y/%m/%d");
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase())
            .or_else(|| extension_for(content_type).map(String::from));
        let id = uuid::Uuid::new_v4();
        match ext {
            Some(ext) => format!("{KEY_PREFIX}/{date}/{id}.{ext}"),
            None => format!("{KEY_PREFIX}/{date}/{id}"),
        }
    }

    /// Resolve a public URL back to a path under `root_dir`.
    fn path_for_url(&self, url: &str) -> Result<PathBuf, CourierError> {
        let key = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                CourierError::MalformedPayload(format!("url `{url}` is not served by this store"))
            })?;
        let relative = Path::new(key);
        let confined = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !confined {
            return Err(CourierError::MalformedPayload(format!(
                "invalid object key `{key}`"
            )));
        }
        Ok(self.root_dir.join(relative))
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "audio/ogg" => Some("ogg"),
        "audio/mpeg" => Some("mp3"),
        "audio/amr" => Some("amr"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

#[async_trait]
impl PluginAdapter for FsBlobStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        match tokio::fs::create_dir_all(&self.root_dir).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "media root {} unavailable: {e}",
                self.root_dir.display()
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredBlob, CourierError> {
        let key = Self::object_key(filename, content_type);
        let path = self.root_dir.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(CourierError::storage)?;
        }
        let size = data.len() as u64;
        tokio::fs::write(&path, data)
            .await
            .map_err(CourierError::storage)?;
        debug!(key = %key, size, "stored media object");
        Ok(StoredBlob {
            url: format!("{}/{key}", self.public_base_url),
            key,
            size,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), CourierError> {
        let path = self.path_for_url(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted media object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CourierError::storage(e)),
        }
    }
}
