pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::archive::ArchiveLocation;
pub use crate::core::build::{
    ArtifactKind, BuildId, BuildRequest, BuildResult, BuildState, LoaderType, ResolvedArtifact,
};
pub use crate::core::config::BundlerConfig;
pub use crate::core::downloader::{ProgressEvent, ProgressLevel, ProgressPhase, ProgressSink};
pub use crate::core::error::{BundlerError, BundlerResult};
pub use crate::core::state::{AppState, BuildGuard};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server_bundler=debug")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
