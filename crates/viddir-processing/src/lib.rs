//! Viddir Processing Library
//!
//! The transcode engine: pure rung computation, the ffmpeg argument builder,
//! ffprobe parsing, per-frame pixel filters and the [`Transcoder`] trait that
//! stages use to drive the external tools.

pub mod command;
pub mod filters;
pub mod ladder;
pub mod probe;
pub mod transcoder;

pub use command::{escape_filter_value, EncodeOptions, FfmpegCommand, TextOverlay};
pub use filters::{FrameOp, FramePlan};
pub use ladder::{
    fit_aspect, resolution_label, ResolutionTarget, Rung, NORMALIZATION_RUNG, PUBLISH_LADDER,
};
pub use probe::{parse_frame_rate, parse_probe_output, MediaProbe};
pub use transcoder::{validate_path, FfmpegTranscoder, FrameGeometry, Transcoder};
