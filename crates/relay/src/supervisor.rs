// Playback Supervisor: waits for the buffer to hold audio, then runs the sink
// against it until the sink ends or the session is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::buffer::BufferStore;
use crate::config::RelayConfig;
use crate::sink::{AudioSink, SinkExit};

/// Why the playback loop of a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The sink ran and finished on its own
    Finished,
    /// The sink was killed, normally by a stop request
    Killed,
    /// The sink could not be started or exited with a failure
    Failed,
    /// The buffer stayed empty for every poll; the sink was never started
    BufferNeverReady,
    /// The session was cancelled before or while the sink ran
    Cancelled,
}

pub struct PlaybackSupervisor {
    sink: Arc<dyn AudioSink>,
    buffer: BufferStore,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl PlaybackSupervisor {
    pub fn new(sink: Arc<dyn AudioSink>, buffer: BufferStore, config: &RelayConfig) -> Self {
        Self {
            sink,
            buffer,
            poll_attempts: config.playback_poll_attempts,
            poll_interval: config.playback_poll_interval,
        }
    }

    pub async fn run(self, token: CancellationToken) -> PlaybackOutcome {
        for attempt in 1..=self.poll_attempts {
            if token.is_cancelled() {
                return PlaybackOutcome::Cancelled;
            }

            if self.buffer.has_data().await {
                return self.play(&token).await;
            }

            info!(attempt, max = self.poll_attempts, "Waiting for buffered audio");
            if attempt == self.poll_attempts {
                break;
            }

            tokio::select! {
                _ = token.cancelled() => return PlaybackOutcome::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        error!(
            attempts = self.poll_attempts,
            path = %self.buffer.path().display(),
            "Buffer never received audio, giving up on playback"
        );
        PlaybackOutcome::BufferNeverReady
    }

    async fn play(&self, token: &CancellationToken) -> PlaybackOutcome {
        let path = self.buffer.path().to_path_buf();

        // Dropping the sink future on cancellation tears the run down.
        let result = tokio::select! {
            _ = token.cancelled() => return PlaybackOutcome::Cancelled,
            result = self.sink.play(&path) => result,
        };

        match result {
            Ok(SinkExit::Finished) => {
                info!("Playback finished");
                PlaybackOutcome::Finished
            }
            Ok(SinkExit::Killed) => {
                debug!("Playback stopped by kill signal");
                PlaybackOutcome::Killed
            }
            Ok(SinkExit::Failed(code)) => {
                error!(?code, "Playback process exited with failure");
                PlaybackOutcome::Failed
            }
            Err(e) => {
                error!(error = %e, "Playback failed");
                PlaybackOutcome::Failed
            }
        }
    }
}
