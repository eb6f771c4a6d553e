use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::core::archive::{ArchiveAssembler, BundleFiles};
use crate::core::build::{BuildId, BuildRequest, BuildResult, BuildState, LoaderType};
use crate::core::config::BundlerConfig;
use crate::core::downloader::{Downloader, ProgressEvent, ProgressSink};
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::loaders::{ResolveContext, Resolver};

/// Forward-only state of one build, logged on every transition.
#[derive(Debug)]
struct StateTracker {
    state: BuildState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: BuildState::Idle,
        }
    }

    fn advance(&mut self, next: BuildState) {
        debug_assert!(
            next > self.state && !self.state.is_terminal(),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Build state changed");
        self.state = next;
    }

    fn fail(&mut self) {
        debug!(from = %self.state, "Build state changed to failed");
        self.state = BuildState::Failed;
    }
}

/// Runs one build end to end: resolve, download, synthesize, assemble.
///
/// Stateless between runs; everything a build allocates is owned by its
/// future, so dropping it (cancellation, deadline) releases it all.
#[derive(Clone)]
pub struct BuildPipeline {
    config: Arc<BundlerConfig>,
    client: reqwest::Client,
}

impl BuildPipeline {
    pub fn new(config: Arc<BundlerConfig>, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Game versions the loader can be bundled for, newest first.
    pub async fn list_versions(&self, loader: LoaderType) -> BundlerResult<Vec<String>> {
        Resolver::new(loader, self.client.clone(), &self.config.endpoints)
            .list_versions()
            .await
    }

    /// Run a build. `cancel` and the configured deadline both cover the
    /// whole resolve/download/assemble sequence.
    pub async fn run(
        &self,
        request: &BuildRequest,
        sink: &ProgressSink,
        cancel: &CancellationToken,
    ) -> BundlerResult<BuildResult> {
        let id = BuildId::new();
        let span = info_span!(
            "build",
            id = %id,
            loader = %request.loader,
            version = %request.version.trim()
        );

        async move {
            let mut tracker = StateTracker::new();
            let started_at = Utc::now();

            let outcome = {
                let work = self.execute(id, request, sink, &mut tracker);
                let bounded = async {
                    match self.config.build_deadline {
                        Some(limit) => tokio::time::timeout(limit, work)
                            .await
                            .unwrap_or(Err(BundlerError::DeadlineExceeded(limit))),
                        None => work.await,
                    }
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(BundlerError::Cancelled),
                    result = bounded => result,
                }
            };

            match outcome {
                Ok(mut result) => {
                    tracker.advance(BuildState::Done);
                    result.started_at = started_at;
                    result.finished_at = Utc::now();
                    info!(
                        archive_bytes = result.archive_size_bytes,
                        ratio = result.compression_ratio_percent,
                        "Build finished: {}",
                        result.archive_name
                    );
                    Ok(result)
                }
                Err(e) => {
                    tracker.fail();
                    error!("Build failed: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        id: BuildId,
        request: &BuildRequest,
        sink: &ProgressSink,
        tracker: &mut StateTracker,
    ) -> BundlerResult<BuildResult> {
        let version = request.version.trim();
        if version.is_empty() {
            return Err(BundlerError::unsupported(
                request.loader,
                version,
                "no version given",
            ));
        }
        // The version ends up in URLs, file names, zip members and scripts.
        if !version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(BundlerError::unsupported(
                request.loader,
                version,
                "version may only contain letters, digits, '.', '_' and '-'",
            ));
        }

        tracker.advance(BuildState::Resolving);
        sink.emit(ProgressEvent::searching(request.loader, version));
        let resolver = Resolver::new(request.loader, self.client.clone(), &self.config.endpoints);
        let artifact = resolver
            .resolve(&ResolveContext::new(version, sink))
            .await?;

        tracker.advance(BuildState::Downloading);
        let downloader = Downloader::new(self.client.clone(), self.config.download.clone());
        let bytes = downloader.download(&artifact, sink).await?;

        tracker.advance(BuildState::Synthesizing);
        sink.emit(ProgressEvent::synthesizing());
        let files = BundleFiles::synthesize(&artifact.file_name, &request.settings);

        tracker.advance(BuildState::Assembling);
        sink.emit(ProgressEvent::assembling(bytes.len() as u64));
        let assembled = ArchiveAssembler::new(self.config.archive.clone())
            .with_temp_prefix(format!("bundle-{id}-"))
            .assemble_files(bytes, &artifact.file_name, files)
            .await?;

        sink.emit(ProgressEvent::done(assembled.size_bytes));

        let now = Utc::now();
        Ok(BuildResult {
            id,
            archive: assembled.location,
            archive_name: request.archive_name(),
            archive_size_bytes: assembled.size_bytes,
            original_artifact_size_bytes: assembled.original_artifact_size_bytes,
            compression_ratio_percent: assembled.compression_ratio_percent,
            archive_sha256: assembled.sha256,
            artifact,
            started_at: now,
            finished_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::time::Duration;

    use sha1::{Digest, Sha1};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zip::ZipArchive;

    use super::*;
    use crate::core::config::{ArchiveStorage, ProviderEndpoints};
    use crate::core::downloader::progress::tests::recording_sink;
    use crate::core::downloader::ProgressPhase;
    use crate::core::http::build_http_client;

    const SERVER_JAR: &[u8] = b"PK\x03\x04 pretend this is a dedicated server jar";

    async fn mount_vanilla(server: &MockServer, jar_delay: Option<Duration>) {
        let manifest = format!(
            r#"{{"versions": [{{"id": "1.20.1", "type": "release", "url": "{}/v1/packages/1.20.1.json"}}]}}"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/mc/game/version_manifest_v2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(manifest, "application/json"))
            .mount(server)
            .await;

        let version = format!(
            r#"{{"id": "1.20.1", "downloads": {{"server": {{"sha1": "{}", "size": {}, "url": "{}/objects/server.jar"}}}}}}"#,
            hex::encode(Sha1::digest(SERVER_JAR)),
            SERVER_JAR.len(),
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/v1/packages/1.20.1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(version, "application/json"))
            .mount(server)
            .await;

        let mut jar = ResponseTemplate::new(200).set_body_bytes(SERVER_JAR);
        if let Some(delay) = jar_delay {
            jar = jar.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path("/objects/server.jar"))
            .respond_with(jar)
            .mount(server)
            .await;
    }

    fn pipeline(server: &MockServer, tweak: impl FnOnce(&mut BundlerConfig)) -> BuildPipeline {
        let mut config = BundlerConfig {
            endpoints: ProviderEndpoints::rooted_at(&server.uri()),
            ..BundlerConfig::default()
        };
        config.download.retry_backoff = Duration::from_millis(10);
        tweak(&mut config);
        let client = build_http_client(&config.download).unwrap();
        BuildPipeline::new(Arc::new(config), client)
    }

    fn member(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn vanilla_build_applies_settings() {
        let server = MockServer::start().await;
        mount_vanilla(&server, None).await;
        let (sink, events) = recording_sink();

        let request = BuildRequest::new(LoaderType::Vanilla, "1.20.1").with_setting("max_players", "10");
        let result = pipeline(&server, |_| {})
            .run(&request, &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.archive_name, "vanilla-1.20.1-server.zip");
        assert_eq!(result.artifact.file_name, "minecraft_server.1.20.1.jar");
        assert_eq!(result.original_artifact_size_bytes, SERVER_JAR.len() as u64);
        assert!(result.archive_size_bytes <= crate::core::config::DEFAULT_MAX_ARCHIVE_BYTES);
        assert!(result.finished_at >= result.started_at);
        assert_eq!(result.archive_sha256.len(), 64);

        let bytes = result.archive.into_bytes().unwrap();
        let properties = member(&bytes, "server.properties");
        assert!(properties.contains("max-players=10\n"));
        assert!(properties.contains("eula=true\n"));
        assert_eq!(member(&bytes, "eula.txt").lines().last(), Some("eula=true"));
        assert!(member(&bytes, "start.sh").contains("minecraft_server.1.20.1.jar"));

        let events = events.lock().unwrap();
        let phases: Vec<ProgressPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(phases.first(), Some(&ProgressPhase::Searching));
        assert_eq!(phases.last(), Some(&ProgressPhase::Done));
        assert!(phases.windows(2).all(|w| w[0] <= w[1]));
        assert!(phases.contains(&ProgressPhase::Synthesizing));
        assert!(phases.contains(&ProgressPhase::Assembling));
    }

    #[tokio::test]
    async fn fabric_below_floor_fails_before_any_request() {
        let server = MockServer::start().await;
        let request = BuildRequest::new(LoaderType::Fabric, "1.12.2");

        let err = pipeline(&server, |_| {})
            .run(&request, &ProgressSink::noop(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BundlerError::UnsupportedCombination { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversize_bundle_leaves_no_temp_file() {
        let server = MockServer::start().await;
        mount_vanilla(&server, None).await;
        let dir = tempfile::tempdir().unwrap();
        let temp_dir = dir.path().to_path_buf();

        let err = pipeline(&server, |c| {
            c.archive.max_archive_bytes = 64;
            c.archive.storage = ArchiveStorage::TempFile;
            c.archive.temp_dir = Some(temp_dir);
        })
        .run(
            &BuildRequest::new(LoaderType::Vanilla, "1.20.1"),
            &ProgressSink::noop(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BundlerError::ArchiveTooLarge { limit: 64, .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_build() {
        let server = MockServer::start().await;
        mount_vanilla(&server, None).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline(&server, |_| {})
            .run(
                &BuildRequest::new(LoaderType::Vanilla, "1.20.1"),
                &ProgressSink::noop(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BundlerError::Cancelled));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deadline_covers_the_download() {
        let server = MockServer::start().await;
        mount_vanilla(&server, Some(Duration::from_secs(5))).await;

        let err = pipeline(&server, |c| {
            c.build_deadline = Some(Duration::from_millis(300));
        })
        .run(
            &BuildRequest::new(LoaderType::Vanilla, "1.20.1"),
            &ProgressSink::noop(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BundlerError::DeadlineExceeded(d) if d == Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn blank_version_is_unsupported() {
        let server = MockServer::start().await;
        let err = pipeline(&server, |_| {})
            .run(
                &BuildRequest::new(LoaderType::Forge, "   "),
                &ProgressSink::noop(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::UnsupportedCombination { .. }));
    }

    #[tokio::test]
    async fn version_with_shell_or_path_characters_is_rejected_offline() {
        let server = MockServer::start().await;
        let pipeline = pipeline(&server, |_| {});

        for version in ["1.20.1-$(touch${IFS}/tmp/x)", "1.20.1/../../etc", "1.20 1"] {
            let err = pipeline
                .run(
                    &BuildRequest::new(LoaderType::Fabric, version),
                    &ProgressSink::noop(),
                    &CancellationToken::new(),
                )
                .await
                .unwrap_err();
            assert!(
                matches!(err, BundlerError::UnsupportedCombination { .. }),
                "{version}: {err:?}"
            );
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
