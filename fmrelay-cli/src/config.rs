use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_engine::RelayConfig;
use serde::Deserialize;
use tracing::debug;

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Name of the application directory created in the working directory.
pub const DEFAULT_APP_DIR_NAME: &str = ".fmgo";

/// Settings read from the optional TOML file and overridden by CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    pub app_dir: Option<PathBuf>,
    pub player: Option<String>,
    pub player_args: Vec<String>,
    pub log_filter: Option<String>,
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fmrelay").join("config.toml"))
    }

    /// Load the configuration file.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| AppError::Config(format!("invalid {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply command line overrides.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(dir) = &args.app_dir {
            self.app_dir = Some(dir.clone());
        }
        if let Some(player) = &args.player {
            self.player = Some(player.clone());
        }
        if !args.player_args.is_empty() {
            self.player_args = args.player_args.clone();
        }
        if let Some(filter) = &args.log_filter {
            self.log_filter = Some(filter.clone());
        }
        self
    }

    pub fn app_dir(&self) -> PathBuf {
        self.app_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_APP_DIR_NAME))
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.app_dir().join("temp")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.app_dir().join("logs")
    }

    /// Create the temp and log directories.
    pub fn prepare_dirs(&self) -> Result<()> {
        for dir in [self.temp_dir(), self.log_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    pub fn relay_config(&self) -> RelayConfig {
        let mut builder = RelayConfig::builder().with_temp_dir(self.temp_dir());

        if let Some(player) = &self.player {
            builder = builder.with_player(player.as_str());
        }
        if !self.player_args.is_empty() {
            builder = builder.with_player_args(self.player_args.iter().cloned());
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent.as_str());
        }
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.with_request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}
