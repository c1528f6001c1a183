// Stream Controller: owns the single active session and starts/stops its fetch and
// playback loops together.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;

use crate::buffer::BufferStore;
use crate::config::{RelayConfig, create_client};
use crate::error::{RelayError, Result};
use crate::fetcher::SegmentFetcher;
use crate::sink::{AudioSink, ProcessSink};
use crate::supervisor::{PlaybackOutcome, PlaybackSupervisor};

/// The running fetch and playback loops for one stream URL.
struct StreamSession {
    url: String,
    generation: u64,
    token: CancellationToken,
    fetch_task: JoinHandle<()>,
    playback_task: JoinHandle<PlaybackOutcome>,
}

/// Public entry point of the relay.
///
/// At most one session is active. `play` supersedes the active session,
/// `stop` tears it down and `cleanup` additionally removes the buffer file and
/// refuses any further `play`. All methods take `&self`, so the controller can
/// be shared behind an `Arc`; session changes are serialized internally.
pub struct StreamController {
    config: Arc<RelayConfig>,
    client: Client,
    sink: Arc<dyn AudioSink>,
    buffer: BufferStore,
    session: Mutex<Option<StreamSession>>,
    playing: AtomicBool,
    current_url: RwLock<Option<String>>,
    generation: AtomicU64,
    terminated: AtomicBool,
}

impl StreamController {
    /// Build a controller that plays through the configured external player.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let sink = ProcessSink::new(config.player.clone())?;
        Self::with_sink(config, Arc::new(sink))
    }

    /// Build a controller around a custom audio sink.
    pub fn with_sink(config: RelayConfig, sink: Arc<dyn AudioSink>) -> Result<Self> {
        let client = create_client(&config.http)?;
        let buffer = BufferStore::new(config.buffer_path());
        info!(buffer = %buffer.path().display(), "Stream controller initialized");

        Ok(Self {
            config: Arc::new(config),
            client,
            sink,
            buffer,
            session: Mutex::new(None),
            playing: AtomicBool::new(false),
            current_url: RwLock::new(None),
            generation: AtomicU64::new(0),
            terminated: AtomicBool::new(false),
        })
    }

    /// Start relaying `url`.
    ///
    /// Playing the URL of the active session is a no-op. Any other URL stops
    /// the active session first. A buffer that cannot be reset fails with
    /// [`RelayError::Start`] and leaves the controller idle.
    pub async fn play(&self, url: &str) -> Result<()> {
        let mut session = self.session.lock().await;

        if self.terminated.load(Ordering::Acquire) {
            return Err(RelayError::Terminated);
        }

        if session.as_ref().is_some_and(|active| active.url == url) {
            info!(url, "Already playing this stream");
            return Ok(());
        }

        let manifest_url =
            Url::parse(url).map_err(|e| RelayError::invalid_url(url, e.to_string()))?;

        if let Some(active) = session.take() {
            self.teardown(active).await;
        }

        if let Err(e) = self.buffer.reset().await {
            error!(path = %self.buffer.path().display(), error = %e, "Failed to create buffer file");
            return Err(RelayError::start(self.buffer.path(), e));
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancellationToken::new();
        let span = info_span!("session", generation, url = %manifest_url);

        let fetcher = SegmentFetcher::new(
            self.client.clone(),
            manifest_url,
            self.buffer.clone(),
            Arc::clone(&self.config),
        );
        let supervisor =
            PlaybackSupervisor::new(Arc::clone(&self.sink), self.buffer.clone(), &self.config);

        let fetch_task = tokio::spawn(fetcher.run(token.clone()).instrument(span.clone()));
        let playback_task = tokio::spawn(supervisor.run(token.clone()).instrument(span));

        *session = Some(StreamSession {
            url: url.to_owned(),
            generation,
            token,
            fetch_task,
            playback_task,
        });
        *self.current_url.write() = Some(url.to_owned());
        self.playing.store(true, Ordering::Release);

        info!(url, generation, "Playback session started");
        Ok(())
    }

    /// Stop the active session, if any.
    ///
    /// Cancels both loops, kills the playback process, waits for the loops to
    /// exit (bounded by `shutdown_timeout`) and truncates the buffer. Idle
    /// controllers are left untouched.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(active) => self.teardown(active).await,
            None => debug!("Stop requested while idle"),
        }
    }

    /// Stop, then remove the buffer file. Every later `play` fails with
    /// [`RelayError::Terminated`]. Safe to call more than once.
    pub async fn cleanup(&self) {
        let mut session = self.session.lock().await;
        if let Some(active) = session.take() {
            self.teardown(active).await;
        }

        if let Err(e) = self.buffer.remove().await {
            warn!(path = %self.buffer.path().display(), error = %e, "Failed to remove buffer file");
        }

        if !self.terminated.swap(true, Ordering::AcqRel) {
            info!("Stream controller cleaned up");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// URL of the active session.
    pub fn current_url(&self) -> Option<String> {
        self.current_url.read().clone()
    }

    /// Number of sessions started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub fn buffer_path(&self) -> &Path {
        self.buffer.path()
    }

    async fn teardown(&self, session: StreamSession) {
        let StreamSession {
            url,
            generation,
            token,
            fetch_task,
            playback_task,
        } = session;

        token.cancel();
        let killed = self.sink.stop();
        self.playing.store(false, Ordering::Release);
        *self.current_url.write() = None;

        let limit = self.config.shutdown_timeout;
        join_within(fetch_task, limit, "fetch").await;
        let outcome = join_within(playback_task, limit, "playback").await;

        if let Err(e) = self.buffer.truncate().await {
            warn!(path = %self.buffer.path().display(), error = %e, "Failed to truncate buffer file");
        }

        info!(url = %url, generation, killed, ?outcome, "Playback session stopped");
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.token.cancel();
            self.sink.stop();
        }
    }
}

/// Wait for a session task, aborting it when it outlives `limit`.
async fn join_within<T>(
    mut task: JoinHandle<T>,
    limit: Duration,
    name: &'static str,
) -> Option<T> {
    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(task = name, error = %e, "Session task ended abnormally");
            None
        }
        Err(_) => {
            warn!(task = name, "Session task did not stop in time, aborting");
            task.abort();
            None
        }
    }
}
