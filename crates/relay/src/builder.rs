use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use tracing::warn;

use crate::config::RelayConfig;

/// Builder for [`RelayConfig`].
#[derive(Debug, Clone, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn with_buffer_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.buffer_file_name = name.into();
        self
    }

    pub fn with_segment_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.segment_extension = extension.into();
        self
    }

    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.config.dedup_capacity = capacity;
        self
    }

    pub fn with_manifest_refresh_interval(mut self, interval: Duration) -> Self {
        self.config.manifest_refresh_interval = interval;
        self
    }

    pub fn with_manifest_retry_delay(mut self, delay: Duration) -> Self {
        self.config.manifest_retry_delay = delay;
        self
    }

    pub fn with_playback_poll(mut self, attempts: u32, interval: Duration) -> Self {
        self.config.playback_poll_attempts = attempts;
        self.config.playback_poll_interval = interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn with_player(mut self, program: impl Into<String>) -> Self {
        self.config.player.program = program.into();
        self
    }

    pub fn with_player_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.player.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.http.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.request_timeout = timeout;
        self
    }

    /// Add a header sent with every manifest and segment request.
    /// Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.config.http.headers.insert(name, value);
            }
            _ => warn!(header = name, "Ignoring invalid HTTP header"),
        }
        self
    }

    pub fn build(self) -> RelayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_policy_constants() {
        let config = RelayConfig::builder()
            .with_dedup_capacity(4)
            .with_playback_poll(2, Duration::from_millis(20))
            .with_player("ffplay")
            .with_player_args(["-nodisp"])
            .with_header("referer", "http://example.com")
            .build();

        assert_eq!(config.dedup_capacity, 4);
        assert_eq!(config.playback_poll_attempts, 2);
        assert_eq!(config.playback_poll_interval, Duration::from_millis(20));
        assert_eq!(config.player.program, "ffplay");
        assert_eq!(config.player.leading_args, vec!["-nodisp".to_string()]);
        assert_eq!(
            config.http.headers.get("referer").unwrap(),
            "http://example.com"
        );
    }

    #[test]
    fn invalid_header_is_ignored() {
        let before = RelayConfig::default().http.headers.len();
        let config = RelayConfig::builder().with_header("bad header", "x").build();
        assert_eq!(config.http.headers.len(), before);
    }
}
