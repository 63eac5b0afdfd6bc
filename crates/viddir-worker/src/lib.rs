//! Viddir Worker Library
//!
//! One single-consumer [`StageWorker`] per pipeline stage, the job handlers
//! that run inside them, and the [`Pipeline`] facade used to submit work.

pub mod context;
pub mod maintenance;
pub mod pipeline;
pub mod queue;
pub mod stages;

pub use context::StageContext;
pub use maintenance::{purge_video_artifacts, PurgeReport};
pub use pipeline::{Pipeline, PublicationToggle};
pub use queue::{
    event_channel, JobEvent, JobHandler, JobSink, Stage, StageJob, StageWorker,
    DEFAULT_POLL_INTERVAL,
};
pub use stages::{EditHandler, FilterHandler, NormalizeHandler, PublishHandler, TranscribeHandler};
