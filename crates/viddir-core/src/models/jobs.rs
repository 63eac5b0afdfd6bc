//! Transient job payloads handed to the edit and filter stages.
//!
//! Normalize, publish and transcribe jobs only carry the video's short URL.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::NEUTRAL_FILTER_LEVEL;

/// Edit request. Each field has a sentinel value that skips its step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditRequest {
    pub video_url: String,
    pub trim_from: Duration,
    pub trim_to: Duration,
    /// ffmpeg transpose code, `-1` for none.
    pub rotation: i32,
    pub aspect_numerator: u32,
    pub aspect_denominator: u32,
    #[serde(default)]
    pub overlay_text: String,
}

impl EditRequest {
    /// A request that changes nothing, for a video of the given length.
    pub fn no_op(video_url: impl Into<String>, duration: Duration) -> Self {
        Self {
            video_url: video_url.into(),
            trim_from: Duration::ZERO,
            trim_to: duration,
            rotation: -1,
            aspect_numerator: 0,
            aspect_denominator: 0,
            overlay_text: String::new(),
        }
    }

    /// Seek window to keep, unless it spans the whole video.
    ///
    /// Bounds are compared at millisecond precision since probed durations are
    /// fractional seconds.
    pub fn trim_window(&self, full_duration: Duration) -> Option<(Duration, Duration)> {
        let untouched = self.trim_from.as_millis() == 0
            && self.trim_to.as_millis() == full_duration.as_millis();
        if untouched {
            None
        } else {
            Some((self.trim_from, self.trim_to))
        }
    }

    pub fn transpose(&self) -> Option<u8> {
        match self.rotation {
            code @ 0..=3 => Some(code as u8),
            _ => None,
        }
    }

    pub fn aspect_ratio(&self) -> Option<(u32, u32)> {
        if self.aspect_numerator != 0 && self.aspect_denominator != 0 {
            Some((self.aspect_numerator, self.aspect_denominator))
        } else {
            None
        }
    }

    pub fn overlay(&self) -> Option<&str> {
        if self.overlay_text.is_empty() {
            None
        } else {
            Some(&self.overlay_text)
        }
    }
}

/// Whole-frame tone selector: `'G'` grayscale, `'S'` sepia, `'N'` none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "char", into = "char")]
pub enum ToneFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
}

impl ToneFilter {
    pub fn from_code(code: char) -> Self {
        match code.to_ascii_uppercase() {
            'G' => ToneFilter::Grayscale,
            'S' => ToneFilter::Sepia,
            _ => ToneFilter::None,
        }
    }

    pub fn code(self) -> char {
        match self {
            ToneFilter::None => 'N',
            ToneFilter::Grayscale => 'G',
            ToneFilter::Sepia => 'S',
        }
    }
}

impl From<char> for ToneFilter {
    fn from(code: char) -> Self {
        ToneFilter::from_code(code)
    }
}

impl From<ToneFilter> for char {
    fn from(tone: ToneFilter) -> Self {
        tone.code()
    }
}

/// Color tint selector: `'R'` red, `'G'` green, `'B'` blue, `'N'` none.
///
/// `'G'` means green here and grayscale for [`ToneFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "char", into = "char")]
pub enum TintFilter {
    #[default]
    None,
    Red,
    Green,
    Blue,
}

impl TintFilter {
    pub fn from_code(code: char) -> Self {
        match code.to_ascii_uppercase() {
            'R' => TintFilter::Red,
            'G' => TintFilter::Green,
            'B' => TintFilter::Blue,
            _ => TintFilter::None,
        }
    }

    pub fn code(self) -> char {
        match self {
            TintFilter::None => 'N',
            TintFilter::Red => 'R',
            TintFilter::Green => 'G',
            TintFilter::Blue => 'B',
        }
    }
}

impl From<char> for TintFilter {
    fn from(code: char) -> Self {
        TintFilter::from_code(code)
    }
}

impl From<TintFilter> for char {
    fn from(tint: TintFilter) -> Self {
        tint.code()
    }
}

/// Filter request. Levels are percentages where 100 leaves the frame unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterRequest {
    pub video_url: String,
    pub tone: ToneFilter,
    pub tint: TintFilter,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
}

impl FilterRequest {
    pub fn neutral(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            tone: ToneFilter::None,
            tint: TintFilter::None,
            brightness: NEUTRAL_FILTER_LEVEL,
            contrast: NEUTRAL_FILTER_LEVEL,
            saturation: NEUTRAL_FILTER_LEVEL,
        }
    }
}
