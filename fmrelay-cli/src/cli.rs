use std::path::PathBuf;

use clap::Parser;

/// Relay a live segmented internet radio stream to a local player.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fmrelay", author, version, about, long_about = None)]
pub struct Args {
    /// Stream manifest URL to start playing right away
    pub url: Option<String>,

    /// Configuration file (defaults to <config dir>/fmrelay/config.toml)
    #[arg(short, long, env = "FMRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application directory holding the temp buffer and logs
    #[arg(long, env = "FMRELAY_APP_DIR")]
    pub app_dir: Option<PathBuf>,

    /// Player executable, invoked with the buffer path as its argument
    #[arg(short, long)]
    pub player: Option<String>,

    /// Extra argument passed to the player before the buffer path (repeatable)
    #[arg(long = "player-arg", allow_hyphen_values = true)]
    pub player_args: Vec<String>,

    /// Log filter directive, e.g. "relay_engine=debug"
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Also print logs to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
