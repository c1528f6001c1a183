#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_engine::{AudioSink, RelayConfig, Result, SinkExit};
use tokio_util::sync::CancellationToken;

/// A call observed by [`RecordingSink`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Start(PathBuf),
    Stop,
}

/// Sink that records calls instead of producing sound.
///
/// A run lasts until `stop` is called, unless `exit_with` makes it end at once.
#[derive(Default)]
pub struct RecordingSink {
    starts: AtomicUsize,
    stop_calls: AtomicUsize,
    events: Mutex<Vec<SinkEvent>>,
    current: Mutex<Option<CancellationToken>>,
    exit_with: Option<SinkExit>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exiting_with(exit: SinkExit) -> Self {
        Self {
            exit_with: Some(exit),
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Start(path) => Some(path.clone()),
                SinkEvent::Stop => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().is_some()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, path: &Path) -> Result<SinkExit> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(SinkEvent::Start(path.to_path_buf()));

        if let Some(exit) = self.exit_with {
            return Ok(exit);
        }

        let token = CancellationToken::new();
        *self.current.lock() = Some(token.clone());
        token.cancelled().await;
        Ok(SinkExit::Killed)
    }

    fn stop(&self) -> bool {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(SinkEvent::Stop);
        match self.current.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Config with short timings, rooted in `dir`.
pub fn fast_config(dir: &Path) -> RelayConfig {
    RelayConfig::builder()
        .with_temp_dir(dir)
        .with_manifest_refresh_interval(Duration::from_millis(50))
        .with_manifest_retry_delay(Duration::from_millis(50))
        .with_playback_poll(5, Duration::from_millis(20))
        .with_shutdown_timeout(Duration::from_secs(2))
        .build()
}

/// Poll `condition` every 10ms until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
