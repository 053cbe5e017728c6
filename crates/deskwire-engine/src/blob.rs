// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob resource manager for preview URLs.
//!
//! Owns the lifecycle of locally-created send previews and remotely-fetched
//! viewer previews. Every URL handed out must be released exactly once:
//! double release and leaks are both invariant violations, so `release`
//! fails loudly on unknown URLs and `active_count` exists for leak
//! assertions.

use std::collections::HashMap;

use deskwire_core::error::DeskwireError;
use tokio::sync::Mutex;
use tracing::trace;

/// Where a blob came from; release responsibility differs per origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobOrigin {
    /// Created from a local file before a media send; released by the send
    /// queue manager at the queue item's terminal state.
    LocalPreview,
    /// Fetched from the server for a message viewer; released on viewer
    /// dismissal or when replaced by a newer fetch.
    RemotePreview,
}

#[derive(Debug)]
struct BlobEntry {
    data: Vec<u8>,
    origin: BlobOrigin,
}

/// Registry of live blob URLs.
#[derive(Debug, Default)]
pub struct BlobStore {
    entries: Mutex<HashMap<String, BlobEntry>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_url() -> String {
        format!("blob:deskwire/{}", uuid::Uuid::new_v4())
    }

    /// Materializes a local send preview. The returned URL is owned by the
    /// queue item it is created for.
    pub async fn create_local_preview(&self, data: Vec<u8>) -> String {
        self.insert(data, BlobOrigin::LocalPreview).await
    }

    /// Materializes a fetched media object for a viewer.
    pub async fn create_remote_preview(&self, data: Vec<u8>) -> String {
        self.insert(data, BlobOrigin::RemotePreview).await
    }

    async fn insert(&self, data: Vec<u8>, origin: BlobOrigin) -> String {
        let url = Self::make_url();
        trace!(url = %url, bytes = data.len(), ?origin, "blob created");
        self.entries
            .lock()
            .await
            .insert(url.clone(), BlobEntry { data, origin });
        url
    }

    /// Resolves a live URL to its bytes.
    pub async fn resolve(&self, url: &str) -> Option<Vec<u8>> {
        self.entries.lock().await.get(url).map(|e| e.data.clone())
    }

    /// Origin of a live URL.
    pub async fn origin(&self, url: &str) -> Option<BlobOrigin> {
        self.entries.lock().await.get(url).map(|e| e.origin)
    }

    /// Releases a URL. Exactly-once: releasing an unknown or
    /// already-released URL is an error.
    pub async fn release(&self, url: &str) -> Result<(), DeskwireError> {
        match self.entries.lock().await.remove(url) {
            Some(_) => {
                trace!(url = %url, "blob released");
                Ok(())
            }
            None => Err(DeskwireError::Blob(format!(
                "release of unknown or already-released blob URL: {url}"
            ))),
        }
    }

    /// Number of live blobs. Zero at teardown means no leaks.
    pub async fn active_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}
