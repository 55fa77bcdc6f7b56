//! Delegate managers the client forwards to
//!
//! The client never talks to the network itself. It fills in defaults and
//! reshapes results; everything else goes through these traits, implemented by
//! [`crate::http::HttpManagers`] for a real backend and
//! [`crate::memory::MemoryBackend`] for tests and offline use.

use crate::types::{FileInfo, ListPage, PfopRequest, PrefopRet, PutExtra};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Listing and metadata of stored objects
#[async_trait]
pub trait BucketManager: Send + Sync {
    /// Fetch one page of keys starting at `marker`
    async fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> Result<ListPage>;

    /// Metadata of a single object
    async fn stat(&self, bucket: &str, key: &str) -> Result<FileInfo>;
}

/// Persistent operation (asynchronous processing job) submission and status
#[async_trait]
pub trait OperationManager: Send + Sync {
    /// Submit a job; returns the persistent id
    async fn pfop(&self, request: &PfopRequest) -> Result<String>;

    /// Current status of a job
    async fn prefop(&self, persistent_id: &str) -> Result<PrefopRet>;
}

/// Form upload of whole objects
#[async_trait]
pub trait FormUploader: Send + Sync {
    /// Upload `data` under `key` with a signed upload token.
    ///
    /// Returns the JSON document rendered from the policy's return body.
    async fn put(
        &self,
        upload_token: &str,
        key: &str,
        data: Bytes,
        extra: &PutExtra,
    ) -> Result<serde_json::Value>;
}
