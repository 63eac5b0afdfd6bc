//! Speech-to-text client.
//!
//! The service reads the audio file from the shared audio bucket by name, so
//! only the file name travels over HTTP.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptResult {
    pub language: String,
    /// SRT-style numbered segments.
    pub transcript: String,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_file_name: &str) -> Result<TranscriptResult>;
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio_file_name: &'a str,
}

#[derive(Clone)]
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
}

impl HttpTranscriber {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn transcribe(&self, audio_file_name: &str) -> Result<TranscriptResult> {
        let response = self
            .client
            .post(&self.url)
            .json(&TranscribeRequest { audio_file_name })
            .send()
            .await
            .context("Failed to send transcription request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Transcription request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let result: TranscriptResult = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        tracing::info!(
            language = %result.language,
            transcript_len = result.transcript.len(),
            "Transcription received"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> HttpTranscriber {
        HttpTranscriber::new(format!("{}/transcribe", server.url()), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn posts_file_name_and_parses_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/transcribe")
            .match_body(Matcher::Json(serde_json::json!({
                "audio_file_name": "abc_720p.mp3"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"language":"en","transcript":"0\n00:00:00,000 --> 00:00:01,500\nHello\n\n"}"#,
            )
            .create_async()
            .await;

        let result = client_for(&server).transcribe("abc_720p.mp3").await.unwrap();

        assert_eq!(result.language, "en");
        assert!(result.transcript.contains("Hello"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/transcribe")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let err = client_for(&server)
            .transcribe("abc.mp3")
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("503"), "{err}");
        assert!(err.contains("model loading"), "{err}");
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/transcribe")
            .with_status(200)
            .with_body(r#"{"language":"en"}"#)
            .create_async()
            .await;

        assert!(client_for(&server).transcribe("abc.mp3").await.is_err());
    }
}
