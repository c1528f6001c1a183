//! Audio output backends.
//!
//! An [`AudioSink`] turns the growing buffer file into sound. The default
//! [`ProcessSink`] hands the file to an external player executable; other
//! implementations (an in-process decoder, a test double) plug in through the
//! same trait without touching the fetch side.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::error::{RelayError, Result};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How a playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkExit {
    /// The output finished on its own with success
    Finished,
    /// Terminated by a kill signal, normally the result of a stop request
    Killed,
    /// The output finished on its own with a failure exit code (if any)
    Failed(Option<i32>),
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play `path` until the output ends or [`AudioSink::stop`] is called.
    async fn play(&self, path: &Path) -> Result<SinkExit>;

    /// Force the current run, if any, to end. Returns whether a run was interrupted.
    fn stop(&self) -> bool;
}

/// Kill switch of the currently running child, tagged so a finished run only
/// disarms its own switch.
struct KillSwitch {
    run_id: u64,
    token: CancellationToken,
}

/// Runs an external player with the buffer path as its input.
pub struct ProcessSink {
    player: PlayerConfig,
    current: Mutex<Option<KillSwitch>>,
    next_run_id: AtomicU64,
}

impl ProcessSink {
    pub fn new(player: PlayerConfig) -> Result<Self> {
        if player.program.trim().is_empty() {
            return Err(RelayError::init("player program is empty"));
        }
        Ok(Self {
            player,
            current: Mutex::new(None),
            next_run_id: AtomicU64::new(0),
        })
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().is_some()
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.player.program);
        cmd.args(&self.player.leading_args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }

    fn arm(&self) -> Armed<'_> {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.current.lock().replace(KillSwitch {
            run_id,
            token: token.clone(),
        });
        // One child per sink: a leftover run is killed.
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        Armed {
            sink: self,
            run_id,
            token,
        }
    }
}

/// Disarms the kill switch when the run ends, including when the `play`
/// future is dropped.
struct Armed<'a> {
    sink: &'a ProcessSink,
    run_id: u64,
    token: CancellationToken,
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        let mut current = self.sink.current.lock();
        if current.as_ref().is_some_and(|s| s.run_id == self.run_id) {
            *current = None;
        }
    }
}

#[async_trait]
impl AudioSink for ProcessSink {
    async fn play(&self, path: &Path) -> Result<SinkExit> {
        let mut child = self.command(path).spawn().map_err(|source| RelayError::Spawn {
            program: self.player.program.clone(),
            source,
        })?;
        let armed = self.arm();

        info!(
            program = %self.player.program,
            pid = child.id(),
            path = %path.display(),
            "Playback process started"
        );

        let exit = tokio::select! {
            _ = armed.token.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill playback process");
                }
                SinkExit::Killed
            }
            status = child.wait() => classify_exit(status?),
        };

        debug!(?exit, "Playback process exited");
        Ok(exit)
    }

    fn stop(&self) -> bool {
        match self.current.lock().take() {
            Some(switch) => {
                switch.token.cancel();
                true
            }
            None => false,
        }
    }
}

fn classify_exit(status: ExitStatus) -> SinkExit {
    if status.success() {
        return SinkExit::Finished;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        const SIGKILL: i32 = 9;
        if status.signal() == Some(SIGKILL) {
            return SinkExit::Killed;
        }
    }

    SinkExit::Failed(status.code())
}
