//! Viddir Core Library
//!
//! This crate provides the domain models, error types, configuration and small
//! helpers that are shared by every stage of the media pipeline.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod short_url;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::AppError;
pub use short_url::generate_short_url;
