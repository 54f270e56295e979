// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object storage for uploaded media.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;

/// Location of an object written to a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBlob {
    /// Publicly reachable URL of the object.
    pub url: String,
    /// Store-relative key.
    pub key: String,
    pub size: u64,
}

/// Opaque blob store returning public URLs.
#[async_trait]
pub trait BlobStore: PluginAdapter {
    /// Store `data` and return its public location.
    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredBlob, CourierError>;

    /// Delete the object previously returned at `url`.
    async fn delete(&self, url: &str) -> Result<(), CourierError>;
}
