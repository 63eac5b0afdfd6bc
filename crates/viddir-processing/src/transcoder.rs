//! Driving ffmpeg and ffprobe.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::RgbaImage;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::command::{EncodeOptions, FfmpegCommand};
use crate::probe::{parse_probe_output, MediaProbe};

/// Size and rate of the raw frames streamed through a frame filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl FrameGeometry {
    pub fn from_probe(probe: &MediaProbe) -> Self {
        Self {
            width: probe.width,
            height: probe.height,
            frame_rate: probe.frame_rate,
        }
    }

    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Media tool operations the pipeline stages depend on.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe(&self, input: &Path) -> Result<MediaProbe>;

    async fn encode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<()>;

    /// Write the audio track of `input` as MP3.
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()>;

    /// Mux the video stream of `video` with the audio of `audio`.
    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Decode `input` frame by frame, run `filter` on each frame and encode
    /// the result as silent H.264. Returns the number of frames written.
    async fn filter_frames(
        &self,
        input: &Path,
        output: &Path,
        geometry: &FrameGeometry,
        filter: &(dyn for<'f> Fn(&'f mut RgbaImage) + Send + Sync),
    ) -> Result<u64>;
}

/// Reject paths that could smuggle shell syntax or escape a directory.
pub fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    validate_path(&path.to_string_lossy())
}

pub fn extract_audio_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output).output_args(["-vn", "-c:a", "libmp3lame"])
}

pub fn replace_audio_command(video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .output_arg("-i")
        .output_arg(audio.to_string_lossy())
        .output_args([
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-shortest",
        ])
}

pub fn frame_decoder_command(input: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, "-").output_args(["-f", "rawvideo", "-pix_fmt", "rgba"])
}

pub fn frame_encoder_command(output: &Path, geometry: &FrameGeometry) -> FfmpegCommand {
    FfmpegCommand::new("-", output)
        .input_arg("-f")
        .input_arg("rawvideo")
        .input_arg("-pix_fmt")
        .input_arg("rgba")
        .input_arg("-s")
        .input_arg(format!("{}x{}", geometry.width, geometry.height))
        .input_arg("-r")
        .input_arg(format!("{:.3}", geometry.frame_rate))
        .output_args(["-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
}

/// Fill `buf` from `reader`. Returns the number of bytes read, which is
/// less than `buf.len()` only at end of stream.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .context("Failed to read decoded frame")?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// [`Transcoder`] backed by the ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Result<Self> {
        let ffmpeg_path = ffmpeg_path.into();
        let ffprobe_path = ffprobe_path.into();
        validate_path(&ffmpeg_path).context("Invalid ffmpeg_path")?;
        validate_path(&ffprobe_path).context("Invalid ffprobe_path")?;
        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }

    async fn run(&self, command: &FfmpegCommand, operation: &str) -> Result<()> {
        validate(command.input())?;
        validate(command.output())?;

        let start = std::time::Instant::now();
        let output = Command::new(&self.ffmpeg_path)
            .args(command.build_args())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("FFmpeg {} failed: {}", operation, stderr.trim()));
        }

        tracing::debug!(
            operation = operation,
            duration_ms = start.elapsed().as_millis() as u64,
            output = %command.output().display(),
            "FFmpeg finished"
        );
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        input = %input.display()
    ))]
    async fn probe(&self, input: &Path) -> Result<MediaProbe> {
        validate(input).context("Invalid video path")?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(input)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe = parse_probe_output(&output.stdout)?;
        tracing::debug!(
            width = probe.width,
            height = probe.height,
            frame_rate = probe.frame_rate,
            has_audio = probe.has_audio,
            "Video probe completed"
        );
        Ok(probe)
    }

    #[tracing::instrument(skip(self, options), fields(
        process.executable.name = "ffmpeg",
        input = %input.display(),
        output = %output.display()
    ))]
    async fn encode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<()> {
        self.run(&options.to_command(input, output), "encode").await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()> {
        self.run(&extract_audio_command(input, output), "audio extraction")
            .await
    }

    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        validate(audio)?;
        self.run(&replace_audio_command(video, audio, output), "audio replacement")
            .await
    }

    #[tracing::instrument(skip(self, filter), fields(
        process.executable.name = "ffmpeg",
        input = %input.display(),
        width = geometry.width,
        height = geometry.height
    ))]
    async fn filter_frames(
        &self,
        input: &Path,
        output: &Path,
        geometry: &FrameGeometry,
        filter: &(dyn for<'f> Fn(&'f mut RgbaImage) + Send + Sync),
    ) -> Result<u64> {
        validate(input)?;
        validate(output)?;
        if geometry.width == 0 || geometry.height == 0 {
            return Err(anyhow!(
                "Invalid frame size {}x{}",
                geometry.width,
                geometry.height
            ));
        }

        let mut decoder = Command::new(&self.ffmpeg_path)
            .args(frame_decoder_command(input).build_args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn ffmpeg decoder")?;
        let mut encoder = Command::new(&self.ffmpeg_path)
            .args(frame_encoder_command(output, geometry).build_args())
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn ffmpeg encoder")?;

        let mut frames_in = decoder
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Decoder stdout unavailable"))?;
        let mut frames_out = encoder
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Encoder stdin unavailable"))?;

        let frame_bytes = geometry.frame_bytes();
        let mut buf = vec![0u8; frame_bytes];
        let mut frames = 0u64;

        loop {
            let read = read_frame(&mut frames_in, &mut buf).await?;
            if read == 0 {
                break;
            }
            if read < frame_bytes {
                tracing::warn!(
                    bytes = read,
                    expected = frame_bytes,
                    "Dropping truncated trailing frame"
                );
                break;
            }

            let mut frame = RgbaImage::from_raw(geometry.width, geometry.height, buf)
                .ok_or_else(|| anyhow!("Decoded frame does not match geometry"))?;
            filter(&mut frame);
            frames_out
                .write_all(frame.as_raw())
                .await
                .context("Failed to write filtered frame")?;
            buf = frame.into_raw();
            frames += 1;
        }

        frames_out.shutdown().await.ok();
        drop(frames_out);

        let decoded = decoder
            .wait_with_output()
            .await
            .context("Failed to wait for ffmpeg decoder")?;
        if !decoded.status.success() {
            return Err(anyhow!(
                "FFmpeg frame decode failed: {}",
                String::from_utf8_lossy(&decoded.stderr).trim()
            ));
        }

        let encoded = encoder
            .wait_with_output()
            .await
            .context("Failed to wait for ffmpeg encoder")?;
        if !encoded.status.success() {
            return Err(anyhow!(
                "FFmpeg frame encode failed: {}",
                String::from_utf8_lossy(&encoded.stderr).trim()
            ));
        }

        tracing::info!(frames = frames, "Frame filter pass finished");
        Ok(frames)
    }
}
