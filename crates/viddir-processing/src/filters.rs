//! Per-frame pixel filters.
//!
//! A [`FramePlan`] is built once per filter job and applied to every decoded
//! RGBA frame. Alpha is never touched.

use image::{Rgba, RgbaImage};
use viddir_core::constants::NEUTRAL_FILTER_LEVEL;
use viddir_core::models::{FilterRequest, TintFilter, ToneFilter};

/// Tint opacity on a 0..=255 scale.
const TINT_ALPHA: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOp {
    Grayscale,
    Sepia,
    /// Alpha-blend every pixel toward this color.
    Tint([u8; 3]),
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
}

impl FrameOp {
    fn apply_pixel(&self, pixel: &mut Rgba<u8>) {
        let [r, g, b, _] = pixel.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);

        let (nr, ng, nb) = match *self {
            FrameOp::Grayscale => {
                let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
                (y, y, y)
            }
            FrameOp::Sepia => (
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ),
            FrameOp::Tint([tr, tg, tb]) => (
                blend(r, tr as f32),
                blend(g, tg as f32),
                blend(b, tb as f32),
            ),
            FrameOp::Brightness(multiplier) => (r * multiplier, g * multiplier, b * multiplier),
            FrameOp::Contrast(factor) => {
                let intercept = 128.0 * (1.0 - factor);
                (
                    r * factor + intercept,
                    g * factor + intercept,
                    b * factor + intercept,
                )
            }
            FrameOp::Saturation(factor) => {
                let gray = 0.299 * r + 0.587 * g + 0.114 * b;
                (
                    gray + (r - gray) * factor,
                    gray + (g - gray) * factor,
                    gray + (b - gray) * factor,
                )
            }
        };

        pixel.0[0] = nr.clamp(0.0, 255.0) as u8;
        pixel.0[1] = ng.clamp(0.0, 255.0) as u8;
        pixel.0[2] = nb.clamp(0.0, 255.0) as u8;
    }
}

/// Ordered list of pixel transforms: tone, tint, brightness, contrast,
/// saturation. Neutral parameters contribute nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    ops: Vec<FrameOp>,
}

impl FramePlan {
    pub fn from_request(request: &FilterRequest) -> Self {
        let mut ops = Vec::new();

        match request.tone {
            ToneFilter::Grayscale => ops.push(FrameOp::Grayscale),
            ToneFilter::Sepia => ops.push(FrameOp::Sepia),
            ToneFilter::None => {}
        }

        match request.tint {
            TintFilter::Red => ops.push(FrameOp::Tint([255, 0, 0])),
            TintFilter::Green => ops.push(FrameOp::Tint([0, 255, 0])),
            TintFilter::Blue => ops.push(FrameOp::Tint([0, 0, 255])),
            TintFilter::None => {}
        }

        if let Some(m) = level_multiplier(request.brightness) {
            ops.push(FrameOp::Brightness(m));
        }
        if let Some(f) = level_multiplier(request.contrast) {
            ops.push(FrameOp::Contrast(f));
        }
        if let Some(f) = level_multiplier(request.saturation) {
            ops.push(FrameOp::Saturation(f));
        }

        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[FrameOp] {
        &self.ops
    }

    pub fn apply(&self, frame: &mut RgbaImage) {
        if self.ops.is_empty() {
            return;
        }
        for pixel in frame.pixels_mut() {
            for op in &self.ops {
                op.apply_pixel(pixel);
            }
        }
    }
}

fn blend(channel: f32, tint: f32) -> f32 {
    (channel * (255.0 - TINT_ALPHA) + tint * TINT_ALPHA) / 255.0
}

fn level_multiplier(level: i32) -> Option<f32> {
    if level == NEUTRAL_FILTER_LEVEL {
        None
    } else {
        Some(level as f32 / 100.0)
    }
}
