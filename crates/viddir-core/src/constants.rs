//! Constants shared across pipeline crates.

/// Bitrate (kbps) of the "good" audio quality preset used by normalization and editing.
pub const AUDIO_QUALITY_GOOD_KBPS: u32 = 192;

/// Frame-rate cap applied by normalization and editing re-encodes.
pub const NORMALIZED_FRAME_RATE: f64 = 24.0;

/// Public gateway prefix used when surfacing content addresses to clients.
pub const DEFAULT_CONTENT_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Level at which brightness, contrast and saturation leave a frame unchanged.
pub const NEUTRAL_FILTER_LEVEL: i32 = 100;

/// Length of generated short URLs.
pub const SHORT_URL_LENGTH: usize = 10;

/// Number of videos returned by the recommendation engine.
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;
