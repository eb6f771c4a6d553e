use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::build::{ArtifactKind, BuildRequest, BuildResult, LoaderType};
use crate::core::downloader::ProgressSink;
use crate::core::error::BundlerResult;
use crate::core::state::AppState;

/// Serializable digest of a finished build, for display or logging.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub id: String,
    pub archive_name: String,
    pub archive_size_bytes: u64,
    pub original_artifact_size_bytes: u64,
    pub compression_ratio_percent: f64,
    pub archive_sha256: String,
    pub artifact_file_name: String,
    pub artifact_url: String,
    pub artifact_kind: ArtifactKind,
    pub duration_ms: i64,
}

impl From<&BuildResult> for BuildSummary {
    fn from(result: &BuildResult) -> Self {
        Self {
            id: result.id.to_string(),
            archive_name: result.archive_name.clone(),
            archive_size_bytes: result.archive_size_bytes,
            original_artifact_size_bytes: result.original_artifact_size_bytes,
            compression_ratio_percent: result.compression_ratio_percent,
            archive_sha256: result.archive_sha256.clone(),
            artifact_file_name: result.artifact.file_name.clone(),
            artifact_url: result.artifact.download_url.clone(),
            artifact_kind: result.artifact.kind,
            duration_ms: (result.finished_at - result.started_at).num_milliseconds(),
        }
    }
}

/// Build one bundle on behalf of `requester`.
///
/// Fails with `BuildInProgress` if that requester already has a build
/// running. The slot is released however this returns.
pub async fn build_server_bundle(
    state: &AppState,
    requester: &str,
    request: BuildRequest,
    sink: ProgressSink,
    cancel: CancellationToken,
) -> BundlerResult<BuildResult> {
    let _guard = state.try_begin_build(requester)?;
    info!(
        "Build requested by {}: {} {}",
        requester, request.loader, request.version
    );

    state.pipeline.run(&request, &sink, &cancel).await
}

/// Versions the loader can be bundled for, newest first.
pub async fn get_minecraft_versions(
    state: &AppState,
    loader: LoaderType,
) -> BundlerResult<Vec<String>> {
    state.pipeline.list_versions(loader).await
}
