//! IPFS HTTP API client used as the content-addressed store.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use viddir_core::models::gateway_link;

use crate::traits::{ContentStore, StorageError, StorageResult};

const API_PREFIX: &str = "api/v0";
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Client for a local IPFS daemon (`/api/v0/add`, `/pin/rm`, `/repo/gc`).
#[derive(Clone)]
pub struct IpfsContentStore {
    http_client: Client,
    api_url: String,
    gateway_url: String,
}

impl std::fmt::Debug for IpfsContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsContentStore")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .finish()
    }
}

impl IpfsContentStore {
    /// `api_url` is the daemon's base URL (e.g. `http://localhost:5001`);
    /// `gateway_url` prefixes the links handed to clients.
    pub fn new(api_url: &str, gateway_url: &str) -> StorageResult<Self> {
        // No overall timeout: adding a large rendition takes as long as it takes.
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.to_string(),
        })
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/{}/{}", self.api_url, API_PREFIX, command)
    }

    async fn ensure_success(response: Response) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StorageError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn add(&self, path: &Path) -> StorageResult<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(path.display().to_string())
            } else {
                StorageError::IoError(e)
            }
        })?;
        let size = file.metadata().await?.len();

        // Renditions can be large; stream the file instead of buffering it.
        let body = Body::wrap_stream(ReaderStream::new(file));
        let form = Form::new().part(
            "file",
            Part::stream_with_length(body, size).file_name(file_name),
        );

        let response = self
            .http_client
            .post(self.endpoint("add"))
            .multipart(form)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        if added.hash.is_empty() {
            return Err(StorageError::InvalidResponse(
                "response carried an empty Hash".to_string(),
            ));
        }

        tracing::info!(content_hash = %added.hash, size_bytes = size, "Added file to content store");
        Ok(added.hash)
    }

    #[tracing::instrument(skip(self))]
    async fn unpin(&self, content_hash: &str) -> StorageResult<()> {
        let response = self
            .http_client
            .post(self.endpoint("pin/rm"))
            .query(&[("arg", content_hash)])
            .send()
            .await?;
        Self::ensure_success(response).await?;
        tracing::info!(content_hash = %content_hash, "Unpinned content");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn collect_garbage(&self) -> StorageResult<()> {
        let response = self
            .http_client
            .post(self.endpoint("repo/gc"))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        tracing::info!("Content store garbage collection finished");
        Ok(())
    }

    fn link(&self, content_hash: &str) -> String {
        gateway_link(&self.gateway_url, content_hash)
    }
}
