//! FFmpeg command builder and the encode options stages ask for.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Burned-in caption drawn in the top-right corner over a translucent box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub font_path: String,
}

impl TextOverlay {
    pub fn new(text: impl Into<String>, font_path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_path: font_path.into(),
        }
    }

    pub fn to_filter(&self) -> String {
        format!(
            "drawtext=fontfile={}:text={}:fontcolor=white:fontsize=32:box=1:boxcolor=black@0.5:boxborderw=5:x=w-text_w-10:y=10",
            escape_filter_value(&self.font_path),
            escape_filter_value(&self.text),
        )
    }
}

/// Escape a value for use as a filter option inside a filtergraph.
///
/// Two levels apply: the option value (`\ ' : %`) and the filtergraph
/// (`\ ' [ ] , ;`).
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':' | '%') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// An H.264/AAC re-encode of one file into another.
///
/// Unset fields leave the corresponding property to ffmpeg.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeOptions {
    pub seek: Option<(Duration, Duration)>,
    pub transpose: Option<u8>,
    pub scale: Option<(u32, u32)>,
    pub overlay: Option<TextOverlay>,
    pub frame_rate: Option<f64>,
    pub video_bitrate_kbps: Option<u32>,
    pub audio_bitrate_kbps: Option<u32>,
    pub fast_start: bool,
}

impl EncodeOptions {
    /// Progressive-playback encode (`+faststart`).
    pub fn fast_start() -> Self {
        Self {
            fast_start: true,
            ..Self::default()
        }
    }

    pub fn seek(mut self, from: Duration, to: Duration) -> Self {
        self.seek = Some((from, to));
        self
    }

    pub fn transpose(mut self, code: u8) -> Self {
        self.transpose = Some(code);
        self
    }

    pub fn scale(mut self, width: u32, height: u32) -> Self {
        self.scale = Some((width, height));
        self
    }

    pub fn overlay(mut self, overlay: TextOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn video_bitrate(mut self, kbps: u32) -> Self {
        self.video_bitrate_kbps = Some(kbps);
        self
    }

    pub fn audio_bitrate(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = Some(kbps);
        self
    }

    /// Filter chain in application order: transpose, scale, drawtext.
    pub fn video_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(code) = self.transpose {
            filters.push(format!("transpose={}", code));
        }
        if let Some((width, height)) = self.scale {
            filters.push(format!("scale={}:{}", width, height));
        }
        if let Some(overlay) = &self.overlay {
            filters.push(overlay.to_filter());
        }
        filters
    }

    pub fn to_command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(input, output);

        if let Some((from, to)) = self.seek {
            cmd = cmd
                .input_arg("-ss")
                .input_arg(format_seconds(from))
                .input_arg("-to")
                .input_arg(format_seconds(to));
        }

        let filters = self.video_filters();
        if !filters.is_empty() {
            cmd = cmd.video_filter(filters.join(","));
        }

        cmd = cmd.video_codec("libx264").audio_codec("aac");

        if let Some(kbps) = self.video_bitrate_kbps {
            cmd = cmd.output_arg("-b:v").output_arg(format!("{}k", kbps));
        }
        if let Some(kbps) = self.audio_bitrate_kbps {
            cmd = cmd.audio_bitrate(format!("{}k", kbps));
        }
        if let Some(fps) = self.frame_rate {
            cmd = cmd.output_arg("-r").output_arg(format_rate(fps));
        }
        if self.fast_start {
            cmd = cmd.output_arg("-movflags").output_arg("+faststart");
        }
        cmd
    }
}

fn format_seconds(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}

/// Frame rate with at most three decimals and no trailing zeros.
fn format_rate(fps: f64) -> String {
    let formatted = format!("{:.3}", fps);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    input_args: Vec<String>,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}
