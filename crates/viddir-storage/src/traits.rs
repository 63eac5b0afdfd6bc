//! Content store abstraction
//!
//! This module defines the `ContentStore` trait implemented by content-addressed
//! backends, and the error type shared with working storage.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Content store returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Content store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid content store response: {0}")]
    InvalidResponse(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Content-addressed storage.
///
/// Added content stays pinned until explicitly unpinned; unpinned content is
/// only reclaimed by a garbage-collection pass.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Add and pin the file at `path`, returning its content address.
    async fn add(&self, path: &Path) -> StorageResult<String>;

    /// Unpin previously added content.
    async fn unpin(&self, content_hash: &str) -> StorageResult<()>;

    /// Reclaim unpinned content.
    async fn collect_garbage(&self) -> StorageResult<()>;

    /// Public link for a content address.
    fn link(&self, content_hash: &str) -> String;
}
