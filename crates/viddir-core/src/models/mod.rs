//! Data models for the media pipeline
//!
//! Records owned by the relational store (videos, their published resolutions
//! and transcripts), the transient job payloads consumed by the stage workers,
//! and the read models used by the recommendation engine.

mod jobs;
mod recommendation;
mod transcript;
mod video;

pub use jobs::*;
pub use recommendation::*;
pub use transcript::*;
pub use video::*;
