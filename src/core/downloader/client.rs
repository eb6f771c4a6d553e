use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use super::progress::{PercentTracker, ProgressEvent, ProgressSink};
use crate::core::build::ResolvedArtifact;
use crate::core::config::DownloadSettings;
use crate::core::error::{BundlerError, BundlerResult};

/// Upper bound for pre-allocating the body from `Content-Length`.
const MAX_PREALLOC: u64 = 128 * 1024 * 1024;

/// Outcome of one failed attempt.
#[derive(Debug)]
enum AttemptError {
    /// Network hiccup worth another full attempt.
    Transient(String),
    /// Retrying cannot help (bad status, redirect loop, ...).
    Fatal(String),
}

impl AttemptError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            AttemptError::Transient(err.to_string())
        } else {
            AttemptError::Fatal(err.to_string())
        }
    }
}

/// Single-connection streaming downloader with bounded full-restart retries.
pub struct Downloader {
    client: Client,
    settings: DownloadSettings,
}

impl Downloader {
    pub fn new(client: Client, settings: DownloadSettings) -> Self {
        Self { client, settings }
    }

    /// Download the artifact into memory.
    ///
    /// Transient failures restart the transfer from byte zero after the
    /// configured backoff, up to `max_attempts` attempts in total. When the
    /// artifact carries a SHA-1 or a size the body is verified once complete.
    /// Progress percentages only move forward across attempts.
    pub async fn download(
        &self,
        artifact: &ResolvedArtifact,
        sink: &ProgressSink,
    ) -> BundlerResult<Vec<u8>> {
        let url = artifact.download_url.as_str();
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        let mut tracker = None;

        let bytes = loop {
            match self.fetch_once(artifact, sink, &mut tracker).await {
                Ok(bytes) => {
                    if attempt > 1 {
                        info!(attempts = attempt, "Download of {} succeeded after retry", url);
                    }
                    break bytes;
                }
                Err(AttemptError::Transient(reason)) if attempt < max_attempts => {
                    warn!(
                        error = %reason,
                        attempt,
                        max_attempts,
                        "Download of {} interrupted, retrying",
                        url
                    );
                    attempt += 1;
                    sink.emit(ProgressEvent::retrying(attempt, max_attempts, &reason));
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
                Err(AttemptError::Transient(reason)) => {
                    return Err(BundlerError::DownloadFailed {
                        url: url.to_string(),
                        reason: format!("gave up after {max_attempts} attempts: {reason}"),
                    });
                }
                Err(AttemptError::Fatal(reason)) => {
                    return Err(BundlerError::DownloadFailed {
                        url: url.to_string(),
                        reason,
                    });
                }
            }
        };

        if let Some(expected) = artifact.size {
            if bytes.len() as u64 != expected {
                return Err(BundlerError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!(
                        "size mismatch: expected {expected} bytes, got {}",
                        bytes.len()
                    ),
                });
            }
        }

        if let Some(expected) = artifact.sha1.as_deref() {
            let actual = hex::encode(Sha1::digest(&bytes));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(BundlerError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("SHA-1 mismatch: expected {expected}, got {actual}"),
                });
            }
        }

        debug!("Downloaded {} ({} bytes)", url, bytes.len());
        Ok(bytes)
    }

    async fn fetch_once(
        &self,
        artifact: &ResolvedArtifact,
        sink: &ProgressSink,
        tracker: &mut Option<PercentTracker>,
    ) -> Result<Vec<u8>, AttemptError> {
        let response = self
            .client
            .get(&artifact.download_url)
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Fatal(format!("HTTP {}", status.as_u16())));
        }

        let total = response
            .content_length()
            .filter(|&n| n > 0)
            .or(artifact.size);
        // The start event goes out once; retries keep the first tracker.
        let tracker = tracker.get_or_insert_with(|| {
            sink.emit(ProgressEvent::download_started(&artifact.file_name, total));
            PercentTracker::new(total)
        });

        let chunk_size = self.settings.chunk_size.max(1);
        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);
        let mut chunk = Vec::with_capacity(chunk_size);

        let mut stream = response.bytes_stream();
        while let Some(next) = stream.next().await {
            // Anything failing mid-body is an interrupted transfer.
            let bytes = next.map_err(|e| AttemptError::Transient(e.to_string()))?;
            let mut rest: &[u8] = &bytes;

            while !rest.is_empty() {
                let take = (chunk_size - chunk.len()).min(rest.len());
                chunk.extend_from_slice(&rest[..take]);
                rest = &rest[take..];

                if chunk.len() == chunk_size {
                    body.append(&mut chunk);
                    tracker.observe(body.len() as u64, sink);
                }
            }
        }

        if !chunk.is_empty() {
            body.append(&mut chunk);
            tracker.observe(body.len() as u64, sink);
        }

        Ok(body)
    }
}
