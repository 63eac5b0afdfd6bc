//! Resolution ladder computation.
//!
//! A [`Rung`] caps width, height, frame rate and audio bitrate. Targets never
//! exceed the source: a source that already fits the box keeps its size, and
//! frame rate and audio bitrate are clamped, never raised.

use viddir_core::constants::{AUDIO_QUALITY_GOOD_KBPS, NORMALIZED_FRAME_RATE};

use crate::probe::MediaProbe;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rung {
    pub max_width: u32,
    pub max_height: u32,
    pub max_frame_rate: f64,
    pub max_audio_bitrate_kbps: u32,
}

/// Single rung applied to freshly uploaded masters.
pub const NORMALIZATION_RUNG: Rung = Rung {
    max_width: 720,
    max_height: 720,
    max_frame_rate: NORMALIZED_FRAME_RATE,
    max_audio_bitrate_kbps: AUDIO_QUALITY_GOOD_KBPS,
};

/// Rungs produced on publish, in encode order.
pub const PUBLISH_LADDER: [Rung; 3] = [
    Rung {
        max_width: 480,
        max_height: 480,
        max_frame_rate: 20.0,
        max_audio_bitrate_kbps: 128,
    },
    Rung {
        max_width: 360,
        max_height: 360,
        max_frame_rate: 15.0,
        max_audio_bitrate_kbps: 96,
    },
    Rung {
        max_width: 240,
        max_height: 240,
        max_frame_rate: 12.0,
        max_audio_bitrate_kbps: 64,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionTarget {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub audio_bitrate_kbps: u32,
}

impl ResolutionTarget {
    pub fn label(&self) -> String {
        resolution_label(self.width, self.height)
    }
}

impl Rung {
    /// Compute the encode target for a source of the given shape.
    ///
    /// When the source exceeds the box, the long axis (height for portrait,
    /// width otherwise) is set to the cap and the other axis follows the
    /// source aspect ratio, rounded half-to-even and then down to even.
    /// A missing audio bitrate falls back to the cap.
    pub fn target(
        &self,
        width: u32,
        height: u32,
        frame_rate: f64,
        audio_bitrate_kbps: Option<u32>,
    ) -> ResolutionTarget {
        let (target_width, target_height) = if width <= self.max_width && height <= self.max_height
        {
            (width, height)
        } else if height > width {
            let scaled = proportional(self.max_height, width, height);
            (even_down(scaled), even_down(self.max_height))
        } else {
            let scaled = proportional(self.max_width, height, width);
            (even_down(self.max_width), even_down(scaled))
        };

        ResolutionTarget {
            width: target_width,
            height: target_height,
            frame_rate: frame_rate.min(self.max_frame_rate),
            audio_bitrate_kbps: audio_bitrate_kbps
                .map_or(self.max_audio_bitrate_kbps, |kbps| {
                    kbps.min(self.max_audio_bitrate_kbps)
                }),
        }
    }

    pub fn target_for(&self, probe: &MediaProbe) -> ResolutionTarget {
        self.target(
            probe.width,
            probe.height,
            probe.frame_rate,
            probe.audio_bitrate_kbps,
        )
    }
}

/// `cap * numerator / denominator`, rounded half-to-even.
fn proportional(cap: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return cap;
    }
    (cap as f64 * numerator as f64 / denominator as f64).round_ties_even() as u32
}

fn even_down(value: u32) -> u32 {
    if value % 2 == 0 {
        value
    } else {
        value - 1
    }
}

/// Label under which a rendition is published, e.g. `480p`.
pub fn resolution_label(width: u32, height: u32) -> String {
    format!("{}p", width.min(height))
}

/// Reshape `width x height` to `numerator:denominator`.
///
/// Portrait frames keep their height, others keep their width; the derived
/// axis is rounded half-to-even and both axes are rounded down to even.
pub fn fit_aspect(width: u32, height: u32, numerator: u32, denominator: u32) -> (u32, u32) {
    if height > width {
        let new_width = proportional(height, numerator, denominator);
        (even_down(new_width), even_down(height))
    } else {
        let new_height = proportional(width, denominator, numerator);
        (even_down(width), even_down(new_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_upscales_small_sources() {
        let target = NORMALIZATION_RUNG.target(600, 400, 30.0, Some(320));
        assert_eq!((target.width, target.height), (600, 400));
        assert_eq!(target.label(), "400p");
    }

    #[test]
    fn landscape_caps_width_and_stays_even() {
        let target = PUBLISH_LADDER[0].target(1001, 667, 30.0, Some(160));
        assert_eq!((target.width, target.height), (480, 320));
        assert_eq!(target.width % 2, 0);
        assert_eq!(target.height % 2, 0);
    }

    #[test]
    fn odd_derived_axis_is_decremented() {
        // 480 * 565 / 1000 = 271.2 -> 271 -> 270
        let target = PUBLISH_LADDER[0].target(1000, 565, 30.0, None);
        assert_eq!((target.width, target.height), (480, 270));

        // 720 * 1080 / 1920 = 405 -> 404
        let target = NORMALIZATION_RUNG.target(1080, 1920, 30.0, None);
        assert_eq!((target.width, target.height), (404, 720));
        assert_eq!(target.label(), "404p");
    }

    #[test]
    fn one_oversized_axis_still_shrinks_into_the_box() {
        let target = NORMALIZATION_RUNG.target(800, 400, 30.0, None);
        assert_eq!((target.width, target.height), (720, 360));
    }

    #[test]
    fn square_sources_get_rung_named_labels() {
        let labels: Vec<String> = PUBLISH_LADDER
            .iter()
            .map(|rung| rung.target(1080, 1080, 30.0, Some(192)).label())
            .collect();
        assert_eq!(labels, vec!["480p", "360p", "240p"]);
    }

    #[test]
    fn frame_rate_and_audio_are_clamped() {
        let target = PUBLISH_LADDER[1].target(1080, 1080, 29.97, Some(320));
        assert_eq!(target.frame_rate, 15.0);
        assert_eq!(target.audio_bitrate_kbps, 96);

        let target = PUBLISH_LADDER[1].target(1080, 1080, 10.0, Some(48));
        assert_eq!(target.frame_rate, 10.0);
        assert_eq!(target.audio_bitrate_kbps, 48);
    }

    #[test]
    fn missing_audio_uses_cap() {
        let target = NORMALIZATION_RUNG.target(1280, 720, 60.0, None);
        assert_eq!(target.audio_bitrate_kbps, AUDIO_QUALITY_GOOD_KBPS);
        assert_eq!(target.frame_rate, NORMALIZED_FRAME_RATE);
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(proportional(480, 9, 16), 270);
        assert_eq!(proportional(5, 1, 2), 2);
        assert_eq!(proportional(7, 1, 2), 4);
    }

    #[test]
    fn fit_aspect_keeps_dominant_axis() {
        assert_eq!(fit_aspect(1280, 720, 1, 1), (1280, 1280));
        assert_eq!(fit_aspect(1280, 720, 4, 3), (1280, 960));
        assert_eq!(fit_aspect(720, 1280, 9, 16), (720, 1280));
        // 1280 * 3 / 4 = 960 wide for a portrait 3:4 frame
        assert_eq!(fit_aspect(720, 1280, 3, 4), (960, 1280));
        // 640 * 9 / 21 = 274.28 -> 274
        assert_eq!(fit_aspect(640, 360, 21, 9), (640, 274));
    }
}
