//! Stage worker: an in-memory FIFO drained by one polling loop.
//!
//! Enqueue never blocks. Once started, the loop takes one job at a time and
//! sleeps for the poll interval whenever the queue is empty, so a job added to
//! an idle worker is seen on the next poll. A failed or panicking job is
//! logged, reported as [`JobEvent::Failed`] and dropped; nothing is retried
//! and nothing survives a restart.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;

use viddir_core::models::{EditRequest, FilterRequest};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Capacity of the job event channel. Slow subscribers miss old events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Normalize,
    Publish,
    Edit,
    Filter,
    Transcribe,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Normalize => write!(f, "normalize"),
            Stage::Publish => write!(f, "publish"),
            Stage::Edit => write!(f, "edit"),
            Stage::Filter => write!(f, "filter"),
            Stage::Transcribe => write!(f, "transcribe"),
        }
    }
}

/// Outcome of one job attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Completed {
        stage: Stage,
        video_url: String,
    },
    Failed {
        stage: Stage,
        video_url: String,
        error: String,
    },
}

impl JobEvent {
    pub fn stage(&self) -> Stage {
        match self {
            JobEvent::Completed { stage, .. } | JobEvent::Failed { stage, .. } => *stage,
        }
    }

    pub fn video_url(&self) -> &str {
        match self {
            JobEvent::Completed { video_url, .. } | JobEvent::Failed { video_url, .. } => video_url,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobEvent::Failed { .. })
    }
}

pub fn event_channel() -> broadcast::Sender<JobEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// A queued unit of work. Every job targets one video.
pub trait StageJob: Send + 'static {
    fn video_url(&self) -> &str;
}

/// Normalize, publish and transcribe jobs are the video's short URL.
impl StageJob for String {
    fn video_url(&self) -> &str {
        self
    }
}

impl StageJob for EditRequest {
    fn video_url(&self) -> &str {
        &self.video_url
    }
}

impl StageJob for FilterRequest {
    fn video_url(&self) -> &str {
        &self.video_url
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    type Job: StageJob;

    fn stage(&self) -> Stage;

    async fn handle(&self, job: Self::Job) -> Result<()>;
}

/// Somewhere a follow-up job can be handed off to.
pub trait JobSink<J>: Send + Sync {
    fn submit(&self, job: J) -> Result<()>;
}

pub struct StageWorker<H: JobHandler> {
    handler: Arc<H>,
    sender: mpsc::UnboundedSender<H::Job>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<H::Job>>>,
    running: AtomicBool,
    poll_interval: Duration,
    events: broadcast::Sender<JobEvent>,
}

impl<H: JobHandler> StageWorker<H> {
    pub fn new(
        handler: Arc<H>,
        poll_interval: Duration,
        events: broadcast::Sender<JobEvent>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            handler,
            sender,
            receiver: Mutex::new(Some(receiver)),
            running: AtomicBool::new(false),
            poll_interval,
            events,
        }
    }

    pub fn stage(&self) -> Stage {
        self.handler.stage()
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn enqueue(&self, job: H::Job) -> Result<()> {
        let video_url = job.video_url().to_string();
        self.sender
            .send(job)
            .map_err(|_| anyhow!("{} queue is closed", self.stage()))?;
        tracing::info!(stage = %self.stage(), video_url = %video_url, "Job enqueued");
        Ok(())
    }

    /// Spawn the worker loop. Only the first call starts it; later calls
    /// return `false`.
    pub fn start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let receiver = self.receiver.lock().ok().and_then(|mut slot| slot.take());
        let Some(receiver) = receiver else {
            tracing::error!(stage = %self.stage(), "Stage queue receiver unavailable");
            return false;
        };

        tokio::spawn(Self::run(
            self.handler.clone(),
            receiver,
            self.poll_interval,
            self.events.clone(),
        ));
        true
    }

    async fn run(
        handler: Arc<H>,
        mut receiver: mpsc::UnboundedReceiver<H::Job>,
        poll_interval: Duration,
        events: broadcast::Sender<JobEvent>,
    ) {
        let stage = handler.stage();
        tracing::info!(
            stage = %stage,
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Stage worker started"
        );

        loop {
            match receiver.try_recv() {
                Ok(job) => Self::process(&handler, job, &events).await,
                Err(mpsc::error::TryRecvError::Empty) => sleep(poll_interval).await,
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }

        tracing::info!(stage = %stage, "Stage worker stopped");
    }

    async fn process(handler: &Arc<H>, job: H::Job, events: &broadcast::Sender<JobEvent>) {
        let stage = handler.stage();
        let video_url = job.video_url().to_string();
        let start = std::time::Instant::now();

        let outcome = AssertUnwindSafe(handler.handle(job)).catch_unwind().await;

        let event = match outcome {
            Ok(Ok(())) => {
                tracing::info!(
                    stage = %stage,
                    video_url = %video_url,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed"
                );
                JobEvent::Completed { stage, video_url }
            }
            Ok(Err(e)) => {
                let error = format!("{:#}", e);
                tracing::error!(
                    stage = %stage,
                    video_url = %video_url,
                    error = %error,
                    "Job failed, dropping it"
                );
                JobEvent::Failed {
                    stage,
                    video_url,
                    error,
                }
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    stage = %stage,
                    video_url = %video_url,
                    panic = %message,
                    "Job panicked, dropping it"
                );
                JobEvent::Failed {
                    stage,
                    video_url,
                    error: format!("panicked: {}", message),
                }
            }
        };

        // No subscribers is fine.
        let _ = events.send(event);
    }
}

/// Enqueue and make sure the loop is running.
impl<H: JobHandler> JobSink<H::Job> for StageWorker<H> {
    fn submit(&self, job: H::Job) -> Result<()> {
        self.enqueue(job)?;
        self.start();
        Ok(())
    }
}
