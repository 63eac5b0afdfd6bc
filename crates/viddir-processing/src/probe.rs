//! ffprobe output parsing.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::time::Duration;

/// Stream properties of a media file as reported by ffprobe.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration: Duration,
    pub video_bitrate_kbps: Option<u32>,
    pub audio_bitrate_kbps: Option<u32>,
    pub has_audio: bool,
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => rate.parse().ok(),
    }
}

fn bitrate_kbps(stream: &Value) -> Option<u32> {
    let bits = match &stream["bit_rate"] {
        Value::String(s) => s.parse::<u64>().ok()?,
        Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    Some((bits / 1000) as u32)
}

fn seconds(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parse the JSON printed by
/// `ffprobe -v quiet -print_format json -show_format -show_streams`.
pub fn parse_probe_output(output: &[u8]) -> Result<MediaProbe> {
    let probe_data: Value =
        serde_json::from_slice(output).context("Failed to parse ffprobe output")?;

    let streams = probe_data["streams"]
        .as_array()
        .ok_or_else(|| anyhow!("ffprobe output has no streams"))?;

    let video = streams
        .iter()
        .find(|s| s["codec_type"] == "video")
        .ok_or_else(|| anyhow!("No video stream found"))?;
    let audio = streams.iter().find(|s| s["codec_type"] == "audio");

    let width = video["width"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse width"))? as u32;
    let height = video["height"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse height"))? as u32;

    let frame_rate = video["r_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .or_else(|| video["avg_frame_rate"].as_str().and_then(parse_frame_rate))
        .filter(|fps| *fps > 0.0)
        .ok_or_else(|| anyhow!("Could not parse frame rate"))?;

    let duration_secs = seconds(&probe_data["format"]["duration"])
        .or_else(|| seconds(&video["duration"]))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| anyhow!("Could not parse duration"))?;

    Ok(MediaProbe {
        width,
        height,
        frame_rate,
        duration: Duration::from_secs_f64(duration_secs),
        video_bitrate_kbps: bitrate_kbps(video),
        audio_bitrate_kbps: audio.and_then(bitrate_kbps),
        has_audio: audio.is_some(),
    })
}
