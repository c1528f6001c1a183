//! Live segmented audio relay.
//!
//! A [`StreamController`] polls a flat segment-list manifest, appends every new
//! segment to a rolling buffer file and drives an [`AudioSink`] against that
//! file until stopped.
//!
//! ```no_run
//! use relay_engine::{RelayConfig, StreamController};
//!
//! # async fn demo() -> relay_engine::Result<()> {
//! let config = RelayConfig::builder().with_temp_dir(".fmgo/temp").build();
//! let controller = StreamController::new(config)?;
//! controller.play("http://radio.example/live/playlist.m3u8").await?;
//! // ...
//! controller.cleanup().await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod builder;
pub mod config;
mod controller;
pub mod dedup;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod sink;
pub mod supervisor;

pub use buffer::BufferStore;
pub use builder::RelayConfigBuilder;
pub use config::{DEFAULT_USER_AGENT, HttpConfig, PlayerConfig, RelayConfig, create_client};
pub use controller::StreamController;
pub use dedup::SegmentDedupCache;
pub use error::{RelayError, Result};
pub use fetcher::{CycleReport, SegmentFetcher};
pub use sink::{AudioSink, ProcessSink, SinkExit};
pub use supervisor::{PlaybackOutcome, PlaybackSupervisor};
