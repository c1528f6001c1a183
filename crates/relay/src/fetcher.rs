// Segment Fetcher: polls the manifest and appends every not-yet-seen segment to the
// session buffer, in manifest order.

use std::sync::Arc;

use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use url::Url;

use crate::buffer::BufferStore;
use crate::config::RelayConfig;
use crate::dedup::SegmentDedupCache;
use crate::error::{RelayError, Result};
use crate::manifest::parse_segment_list;

/// Counters for one manifest pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Segment references found in the manifest, duplicates included
    pub listed: usize,
    pub downloaded: usize,
    /// References already present in the dedup cache
    pub skipped: usize,
    /// Downloads abandoned after a network or file error
    pub failed: usize,
}

pub struct SegmentFetcher {
    client: Client,
    manifest_url: Url,
    buffer: BufferStore,
    dedup: SegmentDedupCache,
    config: Arc<RelayConfig>,
}

impl SegmentFetcher {
    pub fn new(
        client: Client,
        manifest_url: Url,
        buffer: BufferStore,
        config: Arc<RelayConfig>,
    ) -> Self {
        Self {
            client,
            manifest_url,
            buffer,
            dedup: SegmentDedupCache::new(config.dedup_capacity),
            config,
        }
    }

    pub fn dedup(&self) -> &SegmentDedupCache {
        &self.dedup
    }

    /// Poll the manifest until `token` is cancelled.
    ///
    /// Manifest failures are retried after `manifest_retry_delay`; successful
    /// passes are followed by `manifest_refresh_interval`. Both waits end early
    /// on cancellation.
    pub async fn run(mut self, token: CancellationToken) {
        info!(url = %self.manifest_url, "Segment fetcher started");

        while !token.is_cancelled() {
            let delay = match self.run_cycle(&token).await {
                Ok(report) => {
                    debug!(
                        listed = report.listed,
                        downloaded = report.downloaded,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Manifest pass complete"
                    );
                    self.config.manifest_refresh_interval
                }
                Err(e) if e.is_transient() => {
                    error!(url = %self.manifest_url, error = %e, "Failed to read manifest");
                    self.config.manifest_retry_delay
                }
                Err(RelayError::Cancelled) => break,
                Err(e) => {
                    error!(url = %self.manifest_url, error = %e, "Segment fetcher stopping");
                    break;
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("Segment fetcher stopped");
    }

    /// Read the manifest once and download every new segment it lists.
    ///
    /// Only a manifest failure or cancellation is returned as an error; a
    /// failed segment is logged, counted and abandoned.
    pub async fn run_cycle(&mut self, token: &CancellationToken) -> Result<CycleReport> {
        let body = self.fetch_manifest(token).await?;
        let segments = parse_segment_list(
            &body,
            &self.manifest_url,
            &self.config.segment_extension,
        );

        let mut report = CycleReport {
            listed: segments.len(),
            ..CycleReport::default()
        };

        for segment in segments {
            if token.is_cancelled() {
                return Err(RelayError::Cancelled);
            }

            if !self.dedup.insert(segment.as_str()) {
                trace!(url = %segment, "Segment already seen");
                report.skipped += 1;
                continue;
            }

            debug!(url = %segment, "Downloading new segment");
            match self.download_segment(&segment, token).await {
                Ok(bytes) => {
                    trace!(url = %segment, bytes, "Segment appended");
                    report.downloaded += 1;
                }
                Err(RelayError::Cancelled) => return Err(RelayError::Cancelled),
                Err(e) => {
                    error!(url = %segment, error = %e, "Failed to download and append segment");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn fetch_manifest(&self, token: &CancellationToken) -> Result<String> {
        let response = self.get(&self.manifest_url, "manifest fetch", token).await?;

        tokio::select! {
            _ = token.cancelled() => Err(RelayError::Cancelled),
            body = response.text() => Ok(body?),
        }
    }

    /// Stream one segment body into the buffer. Returns the number of bytes appended.
    async fn download_segment(&self, url: &Url, token: &CancellationToken) -> Result<u64> {
        let response = self.get(url, "segment download", token).await?;

        let mut file = self.buffer.append().await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => return Err(RelayError::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }

    async fn get(
        &self,
        url: &Url,
        operation: &'static str,
        token: &CancellationToken,
    ) -> Result<Response> {
        let request = self.client.get(url.clone()).send();
        let response = tokio::select! {
            _ = token.cancelled() => return Err(RelayError::Cancelled),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::http_status(status, url.as_str(), operation));
        }
        Ok(response)
    }
}
