use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::build::LoaderType;

/// Central error type for the bundler backend.
/// Every module returns `Result<T, BundlerError>`.
#[derive(Debug, Error)]
pub enum BundlerError {
    // ── Resolution ──────────────────────────────────────
    #[error("No {loader} server artifact for Minecraft {version}: {reason}")]
    UnsupportedCombination {
        loader: LoaderType,
        version: String,
        reason: String,
    },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    // ── Transfer ────────────────────────────────────────
    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Archive ─────────────────────────────────────────
    #[error("Archive is {size} bytes, above the {limit} byte delivery limit")]
    ArchiveTooLarge { size: u64, limit: u64 },

    #[error("Archive assembly failed: {0}")]
    AssemblyFailed(String),

    // ── Orchestration ───────────────────────────────────
    #[error("A build is already running for {0}")]
    BuildInProgress(String),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Build exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    // ── Configuration / IO ──────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenience alias used throughout the crate.
pub type BundlerResult<T> = Result<T, BundlerError>;

impl BundlerError {
    pub(crate) fn unsupported(
        loader: LoaderType,
        version: &str,
        reason: impl Into<String>,
    ) -> Self {
        BundlerError::UnsupportedCombination {
            loader,
            version: version.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the user can fix this by changing the request
    /// (version, loader, or settings) rather than simply retrying.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            BundlerError::UnsupportedCombination { .. }
                | BundlerError::ArchiveTooLarge { .. }
                | BundlerError::BuildInProgress(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_too_large_message_carries_both_sizes() {
        let err = BundlerError::ArchiveTooLarge {
            size: 60_000_000,
            limit: 51_904_512,
        };
        let msg = err.to_string();
        assert!(msg.contains("60000000"));
        assert!(msg.contains("51904512"));
        assert!(err.is_user_correctable());
    }

    #[test]
    fn download_failure_is_not_user_correctable() {
        let err = BundlerError::DownloadFailed {
            url: "https://example.com/server.jar".into(),
            reason: "timed out".into(),
        };
        assert!(!err.is_user_correctable());
    }
}
