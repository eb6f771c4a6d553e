//! Progress events streamed to the caller during a build.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::build::LoaderType;

/// Coarse phase of a build, in the order phases occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Searching,
    Downloading,
    Retrying,
    Synthesizing,
    Assembling,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressLevel {
    Info,
    Warning,
}

/// Payload handed to the progress sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub level: ProgressLevel,
    /// Only set while downloading with a known total, on 10% boundaries.
    pub percent: Option<u8>,
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
    pub message: Option<String>,
}

impl ProgressEvent {
    fn info(phase: ProgressPhase) -> Self {
        Self {
            phase,
            level: ProgressLevel::Info,
            percent: None,
            bytes_done: 0,
            bytes_total: None,
            message: None,
        }
    }

    pub fn searching(loader: LoaderType, version: &str) -> Self {
        Self {
            message: Some(format!("Looking up {loader} {version}")),
            ..Self::info(ProgressPhase::Searching)
        }
    }

    /// Non-fatal notice raised while resolving (e.g. an installer instead
    /// of a runnable server).
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ProgressLevel::Warning,
            message: Some(message.into()),
            ..Self::info(ProgressPhase::Searching)
        }
    }

    pub fn download_started(file_name: &str, total: Option<u64>) -> Self {
        Self {
            percent: total.map(|_| 0),
            bytes_total: total,
            message: Some(format!("Downloading {file_name}")),
            ..Self::info(ProgressPhase::Downloading)
        }
    }

    pub fn downloading(percent: u8, bytes_done: u64, bytes_total: u64) -> Self {
        Self {
            percent: Some(percent),
            bytes_done,
            bytes_total: Some(bytes_total),
            ..Self::info(ProgressPhase::Downloading)
        }
    }

    pub fn retrying(next_attempt: u32, max_attempts: u32, reason: &str) -> Self {
        Self {
            level: ProgressLevel::Warning,
            message: Some(format!(
                "Transfer interrupted ({reason}), attempt {next_attempt}/{max_attempts}"
            )),
            ..Self::info(ProgressPhase::Retrying)
        }
    }

    pub fn synthesizing() -> Self {
        Self::info(ProgressPhase::Synthesizing)
    }

    pub fn assembling(artifact_bytes: u64) -> Self {
        Self {
            bytes_total: Some(artifact_bytes),
            ..Self::info(ProgressPhase::Assembling)
        }
    }

    pub fn done(archive_bytes: u64) -> Self {
        Self {
            bytes_done: archive_bytes,
            bytes_total: Some(archive_bytes),
            ..Self::info(ProgressPhase::Done)
        }
    }
}

/// Caller-supplied progress callback. Delivery is best-effort: the sink
/// may drop events, the pipeline never waits on it.
#[derive(Clone)]
pub struct ProgressSink(Arc<dyn Fn(ProgressEvent) + Send + Sync>);

impl ProgressSink {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn emit(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressSink")
    }
}

/// Emits a download event each time completion crosses a new 10% mark.
#[derive(Debug)]
pub(crate) struct PercentTracker {
    total: Option<u64>,
    last_decile: u8,
}

impl PercentTracker {
    pub(crate) fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|&t| t > 0),
            last_decile: 0,
        }
    }

    pub(crate) fn observe(&mut self, done: u64, sink: &ProgressSink) {
        let Some(total) = self.total else {
            return;
        };

        let percent = (done.saturating_mul(100) / total).min(100) as u8;
        let decile = percent / 10 * 10;
        if decile > self.last_decile {
            self.last_decile = decile;
            sink.emit(ProgressEvent::downloading(decile, done, total));
        }
    }
}
