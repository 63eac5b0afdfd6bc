//! In-memory collaborators for driving stage handlers without ffmpeg, a
//! database or a content store.
//!
//! Run with: `cargo test -p viddir-worker`

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use uuid::Uuid;

use viddir_core::models::{ResolutionRecord, Transcript, Video};
use viddir_core::AppError;
use viddir_db::VideoRepository;
use viddir_processing::{EncodeOptions, FrameGeometry, MediaProbe, Transcoder};
use viddir_services::{TranscriptResult, Transcriber};
use viddir_storage::{ContentStore, StorageResult, WorkingStorage};
use viddir_worker::{JobEvent, JobSink, Stage, StageContext};

#[derive(Default)]
pub struct MemoryVideos {
    videos: Mutex<HashMap<Uuid, Video>>,
    resolutions: Mutex<Vec<ResolutionRecord>>,
    transcripts: Mutex<Vec<Transcript>>,
}

impl MemoryVideos {
    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    pub fn video(&self, id: Uuid) -> Video {
        self.videos.lock().unwrap()[&id].clone()
    }

    pub fn labels(&self, video_id: Uuid) -> Vec<String> {
        let mut labels: Vec<String> = self
            .resolutions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.video_id == video_id)
            .map(|r| r.resolution.clone())
            .collect();
        labels.sort();
        labels
    }

    pub fn transcripts_for(&self, video_id: Uuid) -> Vec<Transcript> {
        self.transcripts
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.video_id == video_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl VideoRepository for MemoryVideos {
    async fn find_video_by_url(&self, url: &str) -> Result<Option<Video>, AppError> {
        Ok(self
            .videos
            .lock()
            .unwrap()
            .values()
            .find(|v| v.url == url)
            .cloned())
    }

    async fn find_video_by_id(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.videos.lock().unwrap().get(&id).cloned())
    }

    async fn update_video(&self, video: &Video) -> Result<i64, AppError> {
        let mut videos = self.videos.lock().unwrap();
        let stored = videos
            .get_mut(&video.id)
            .ok_or_else(|| AppError::video_not_found(&video.url))?;
        let previous = stored.revision;
        *stored = video.clone();
        stored.revision = previous + 1;
        Ok(previous)
    }

    async fn resolutions(&self, video_id: Uuid) -> Result<Vec<ResolutionRecord>, AppError> {
        Ok(self
            .resolutions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.video_id == video_id)
            .cloned()
            .collect())
    }

    async fn insert_resolution(&self, record: &ResolutionRecord) -> Result<(), AppError> {
        self.resolutions.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn delete_resolutions(
        &self,
        video_id: Uuid,
        resolution: Option<&str>,
    ) -> Result<u64, AppError> {
        let mut records = self.resolutions.lock().unwrap();
        let before = records.len();
        records.retain(|r| {
            r.video_id != video_id || resolution.is_some_and(|label| r.resolution != label)
        });
        Ok((before - records.len()) as u64)
    }

    async fn transcript(&self, video_id: Uuid) -> Result<Option<Transcript>, AppError> {
        Ok(self.transcripts_for(video_id).into_iter().next())
    }

    async fn insert_transcript(&self, transcript: &Transcript) -> Result<(), AppError> {
        self.transcripts.lock().unwrap().push(transcript.clone());
        Ok(())
    }

    async fn delete_transcript(&self, video_id: Uuid) -> Result<bool, AppError> {
        let mut transcripts = self.transcripts.lock().unwrap();
        let before = transcripts.len();
        transcripts.retain(|t| t.video_id != video_id);
        Ok(transcripts.len() != before)
    }
}

/// Writes placeholder outputs instead of running ffmpeg.
pub struct ScriptedTranscoder {
    probe: Mutex<MediaProbe>,
    fail_output_containing: Mutex<Option<String>>,
    encodes: Mutex<Vec<(String, EncodeOptions)>>,
    filtered: AtomicUsize,
    remuxed: AtomicUsize,
}

impl ScriptedTranscoder {
    pub fn new(probe: MediaProbe) -> Self {
        Self {
            probe: Mutex::new(probe),
            fail_output_containing: Mutex::new(None),
            encodes: Mutex::new(Vec::new()),
            filtered: AtomicUsize::new(0),
            remuxed: AtomicUsize::new(0),
        }
    }

    pub fn set_probe(&self, probe: MediaProbe) {
        *self.probe.lock().unwrap() = probe;
    }

    /// Make every encode whose output name contains `pattern` fail.
    pub fn fail_outputs_containing(&self, pattern: &str) {
        *self.fail_output_containing.lock().unwrap() = Some(pattern.to_string());
    }

    pub fn encodes(&self) -> Vec<(String, EncodeOptions)> {
        self.encodes.lock().unwrap().clone()
    }

    pub fn encode_count(&self) -> usize {
        self.encodes.lock().unwrap().len()
    }

    pub fn filter_count(&self) -> usize {
        self.filtered.load(Ordering::SeqCst)
    }

    pub fn remux_count(&self) -> usize {
        self.remuxed.load(Ordering::SeqCst)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn require_input(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await? {
        Ok(())
    } else {
        Err(anyhow!("input missing: {}", path.display()))
    }
}

#[async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn probe(&self, input: &Path) -> Result<MediaProbe> {
        require_input(input).await?;
        Ok(self.probe.lock().unwrap().clone())
    }

    async fn encode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<()> {
        require_input(input).await?;
        let name = file_name(output);
        let fail = self
            .fail_output_containing
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|pattern| name.contains(pattern));
        self.encodes
            .lock()
            .unwrap()
            .push((name.clone(), options.clone()));
        if fail {
            // ffmpeg leaves a truncated container behind when it dies mid-encode.
            tokio::fs::write(output, b"partial").await?;
            return Err(anyhow!("FFmpeg encoding failed: scripted failure for {}", name));
        }
        tokio::fs::write(output, b"encoded").await?;
        Ok(())
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()> {
        require_input(input).await?;
        tokio::fs::write(output, b"mp3").await?;
        Ok(())
    }

    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        require_input(video).await?;
        require_input(audio).await?;
        self.remuxed.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(output, b"muxed").await?;
        Ok(())
    }

    async fn filter_frames(
        &self,
        input: &Path,
        output: &Path,
        geometry: &FrameGeometry,
        filter: &(dyn for<'f> Fn(&'f mut RgbaImage) + Send + Sync),
    ) -> Result<u64> {
        require_input(input).await?;
        let mut frame = RgbaImage::new(geometry.width.min(4), geometry.height.min(4));
        filter(&mut frame);
        self.filtered.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(output, b"filtered").await?;
        Ok(1)
    }
}

/// Hands out sequential content addresses and remembers what was unpinned.
#[derive(Default)]
pub struct CountingStore {
    added: Mutex<Vec<String>>,
    unpinned: Mutex<Vec<String>>,
    gc_runs: AtomicUsize,
}

impl CountingStore {
    pub fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }

    pub fn unpinned(&self) -> Vec<String> {
        self.unpinned.lock().unwrap().clone()
    }

    pub fn gc_runs(&self) -> usize {
        self.gc_runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn add(&self, path: &Path) -> StorageResult<String> {
        let mut added = self.added.lock().unwrap();
        added.push(file_name(path));
        Ok(format!("QmHash{}", added.len()))
    }

    async fn unpin(&self, content_hash: &str) -> StorageResult<()> {
        self.unpinned.lock().unwrap().push(content_hash.to_string());
        Ok(())
    }

    async fn collect_garbage(&self) -> StorageResult<()> {
        self.gc_runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn link(&self, content_hash: &str) -> String {
        format!("http://gateway.test/{}", content_hash)
    }
}

#[derive(Default)]
pub struct CannedTranscriber {
    requests: Mutex<Vec<String>>,
}

impl CannedTranscriber {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for CannedTranscriber {
    async fn transcribe(&self, audio_file_name: &str) -> Result<TranscriptResult> {
        self.requests
            .lock()
            .unwrap()
            .push(audio_file_name.to_string());
        Ok(TranscriptResult {
            language: "en".to_string(),
            transcript: "1\n00:00:00,000 --> 00:00:01,000\nhello\n".to_string(),
        })
    }
}

/// Collects follow-up jobs instead of running them.
#[derive(Default)]
pub struct CollectingSink {
    jobs: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn jobs(&self) -> Vec<String> {
        self.jobs.lock().unwrap().clone()
    }
}

impl JobSink<String> for CollectingSink {
    fn submit(&self, job: String) -> Result<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

pub fn probe(width: u32, height: u32) -> MediaProbe {
    MediaProbe {
        width,
        height,
        frame_rate: 30.0,
        duration: Duration::from_secs(10),
        video_bitrate_kbps: Some(2_500),
        audio_bitrate_kbps: Some(256),
        has_audio: true,
    }
}

pub struct TestEnv {
    pub ctx: StageContext,
    pub videos: Arc<MemoryVideos>,
    pub transcoder: Arc<ScriptedTranscoder>,
    pub store: Arc<CountingStore>,
    pub transcriber: Arc<CannedTranscriber>,
    pub dir: TempDir,
}

impl TestEnv {
    pub async fn new(probe: MediaProbe) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = WorkingStorage::new(
            dir.path().join("Videos"),
            dir.path().join("Thumbnails"),
            dir.path().join("Audios"),
        )
        .await
        .unwrap();

        let videos = Arc::new(MemoryVideos::default());
        let transcoder = Arc::new(ScriptedTranscoder::new(probe));
        let store = Arc::new(CountingStore::default());
        let transcriber = Arc::new(CannedTranscriber::default());

        let ctx = StageContext {
            videos: videos.clone(),
            transcoder: transcoder.clone(),
            content_store: store.clone(),
            transcriber: transcriber.clone(),
            storage,
            overlay_font_path: "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string(),
        };

        Self {
            ctx,
            videos,
            transcoder,
            store,
            transcriber,
            dir,
        }
    }

    /// Register an unpublished video and write its working file.
    pub async fn seed_video(&self, url: &str, working_file: &str) -> Video {
        let video = Video::new(url, Uuid::new_v4(), "Test video", working_file);
        tokio::fs::write(self.video_path(working_file), b"master")
            .await
            .unwrap();
        self.videos.insert(video.clone());
        video
    }

    pub fn video_path(&self, file_name: &str) -> PathBuf {
        self.ctx.storage.video_path(file_name).unwrap()
    }

    pub fn audio_path(&self, file_name: &str) -> PathBuf {
        self.ctx.storage.audio_path(file_name).unwrap()
    }
}

/// Wait for the event of `stage` on `video_url`, failing after a few seconds.
pub async fn wait_for(
    events: &mut broadcast::Receiver<JobEvent>,
    stage: Stage,
    video_url: &str,
) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.stage() == stage && event.video_url() == video_url {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {} event for {}", stage, video_url))
}
