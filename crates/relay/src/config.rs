use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{RelayError, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// File name of the rolling buffer inside the temp directory.
pub const DEFAULT_BUFFER_FILE_NAME: &str = "stream-buffer.aac";

/// Suffix identifying segment references in a manifest.
pub const DEFAULT_SEGMENT_EXTENSION: &str = ".aac";

/// Number of recently accepted segment URLs remembered per session.
pub const DEFAULT_DEDUP_CAPACITY: usize = 10;

#[cfg(target_os = "macos")]
pub const DEFAULT_PLAYER_PROGRAM: &str = "afplay";
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_PLAYER_PROGRAM: &str = "mpv";

/// External decoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Executable name or path
    pub program: String,
    /// Arguments placed before the buffer path. Empty by default so the
    /// player receives the buffer path as its only argument.
    pub leading_args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PLAYER_PROGRAM.to_owned(),
            leading_args: Vec::new(),
        }
    }
}

/// HTTP client settings shared by manifest and segment requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Per-request timeout. Zero disables it.
    pub request_timeout: Duration,
    pub headers: HeaderMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            headers: HttpConfig::default_headers(),
        }
    }
}

impl HttpConfig {
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        headers
    }
}

/// Configuration of a relay controller and the loops it drives.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Directory holding the per-run buffer file
    pub temp_dir: PathBuf,

    pub buffer_file_name: String,

    pub segment_extension: String,

    /// Capacity of the per-session segment dedup cache
    pub dedup_capacity: usize,

    /// Pause between two manifest reads
    pub manifest_refresh_interval: Duration,

    /// Pause after a failed manifest read
    pub manifest_retry_delay: Duration,

    /// How many times playback checks for buffered data before giving up
    pub playback_poll_attempts: u32,

    pub playback_poll_interval: Duration,

    /// Upper bound on how long `stop` waits for the session loops to exit
    pub shutdown_timeout: Duration,

    pub player: PlayerConfig,

    pub http: HttpConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            buffer_file_name: DEFAULT_BUFFER_FILE_NAME.to_owned(),
            segment_extension: DEFAULT_SEGMENT_EXTENSION.to_owned(),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            manifest_refresh_interval: Duration::from_secs(5),
            manifest_retry_delay: Duration::from_secs(5),
            playback_poll_attempts: 5,
            playback_poll_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
            player: PlayerConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn builder() -> crate::builder::RelayConfigBuilder {
        crate::builder::RelayConfigBuilder::new()
    }

    /// Full path of the buffer file.
    pub fn buffer_path(&self) -> PathBuf {
        self.temp_dir.join(&self.buffer_file_name)
    }
}

/// Build the HTTP client used by every session of a controller.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .connect_timeout(config.connect_timeout);

    if !config.request_timeout.is_zero() {
        builder = builder.timeout(config.request_timeout);
    }

    builder
        .build()
        .map_err(|e| RelayError::init(format!("failed to build HTTP client: {e}")))
}
