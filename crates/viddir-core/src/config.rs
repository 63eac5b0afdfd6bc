//! Configuration module
//!
//! Pipeline configuration is read from the environment (optionally seeded by a
//! `.env` file). Every setting except the database URL has a default that
//! matches a single-host deployment: a local content-store daemon, a local
//! speech-to-text service and three working directories next to the binary.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_CONTENT_GATEWAY, DEFAULT_RECOMMENDATION_LIMIT};

const DB_MAX_CONNECTIONS: u32 = 10;
const TRANSCRIPTION_TIMEOUT_SECS: u64 = 40 * 60;
const WORKER_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    // Working storage buckets
    pub videos_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub audio_dir: PathBuf,
    // Transcoding tool
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub overlay_font_path: String,
    // Content-addressed store
    pub content_store_url: String,
    pub content_gateway_url: String,
    // Speech-to-text service
    pub transcription_url: String,
    pub transcription_timeout_secs: u64,
    // Workers
    pub worker_poll_interval_secs: u64,
    pub recommendation_limit: usize,
}

/// Read `key` and parse it, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Self {
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            videos_dir: PathBuf::from(env_string("VIDEOS_DIR", "Videos")),
            thumbnails_dir: PathBuf::from(env_string("THUMBNAILS_DIR", "Thumbnails")),
            audio_dir: PathBuf::from(env_string("AUDIO_DIR", "Audios")),
            ffmpeg_path: env_string("FFMPEG_PATH", "ffmpeg"),
            ffprobe_path: env_string("FFPROBE_PATH", "ffprobe"),
            overlay_font_path: env_string("OVERLAY_FONT_PATH", "Fonts/Lobster-Regular.ttf"),
            content_store_url: env_string("CONTENT_STORE_URL", "http://localhost:5001"),
            content_gateway_url: env_string("CONTENT_GATEWAY_URL", DEFAULT_CONTENT_GATEWAY),
            transcription_url: env_string(
                "TRANSCRIPTION_URL",
                "http://localhost:7558/transcribe",
            ),
            transcription_timeout_secs: env_or(
                "TRANSCRIPTION_TIMEOUT_SECS",
                TRANSCRIPTION_TIMEOUT_SECS,
            ),
            worker_poll_interval_secs: env_or(
                "WORKER_POLL_INTERVAL_SECS",
                WORKER_POLL_INTERVAL_SECS,
            ),
            recommendation_limit: env_or("RECOMMENDATION_LIMIT", DEFAULT_RECOMMENDATION_LIMIT),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        for (name, url) in [
            ("CONTENT_STORE_URL", &self.content_store_url),
            ("CONTENT_GATEWAY_URL", &self.content_gateway_url),
            ("TRANSCRIPTION_URL", &self.transcription_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!("{} must be an http(s) URL", name));
            }
        }

        if self.worker_poll_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "WORKER_POLL_INTERVAL_SECS must be greater than zero"
            ));
        }

        if self.recommendation_limit == 0 {
            return Err(anyhow::anyhow!("RECOMMENDATION_LIMIT must be greater than zero"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_secs(self.worker_poll_interval_secs)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }
}
