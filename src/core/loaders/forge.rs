use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::context::ResolveContext;
use super::resolver::ArtifactResolver;
use crate::core::build::{LoaderType, ResolvedArtifact};
use crate::core::downloader::ProgressEvent;
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::http::{get_json, get_text};
use crate::core::maven::{MavenArtifact, MavenMetadata, FORGE_ARTIFACT, FORGE_GROUP};
use crate::core::version::{sort_newest_first, GameVersion};

/// Minor versions whose Forge builds ship a runnable `-universal` jar.
const UNIVERSAL_MINORS: std::ops::RangeInclusive<u32> = 7..=12;

/// Subset of Forge's `promotions_slim.json`.
#[derive(Debug, Deserialize)]
struct ForgePromotions {
    #[serde(default)]
    promos: HashMap<String, String>,
}

impl ForgePromotions {
    /// `<version>-latest`, else `<version>-recommended`.
    fn build_for(&self, minecraft_version: &str) -> Option<&str> {
        self.promos
            .get(&format!("{minecraft_version}-latest"))
            .or_else(|| self.promos.get(&format!("{minecraft_version}-recommended")))
            .map(String::as_str)
    }
}

/// How a Forge release names its downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactScheme {
    /// `forge-<id>-universal.jar`, runnable as a server.
    Universal,
    /// `forge-<id>-installer.jar`, must be run with `--installServer`.
    Installer,
}

impl ArtifactScheme {
    pub fn for_version(version: GameVersion) -> Self {
        if UNIVERSAL_MINORS.contains(&version.minor) {
            ArtifactScheme::Universal
        } else {
            ArtifactScheme::Installer
        }
    }
}

/// Upstream naming inconsistencies, keyed by game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeQuirk {
    /// Some builds repeat the game version: `1.7.10-10.13.4.1614-1.7.10`.
    /// Probe the regular name first, fall back to the duplicated one.
    DuplicatedVersionSuffix,
}

const FORGE_QUIRKS: &[(&str, ForgeQuirk)] = &[("1.7.10", ForgeQuirk::DuplicatedVersionSuffix)];

pub fn quirk_for(minecraft_version: &str) -> Option<ForgeQuirk> {
    FORGE_QUIRKS
        .iter()
        .find(|(version, _)| *version == minecraft_version)
        .map(|(_, quirk)| *quirk)
}

/// Resolves Forge artifacts from the promotions document and Forge maven.
pub struct ForgeResolver {
    client: reqwest::Client,
    promotions_url: String,
    maven_base: String,
}

impl ForgeResolver {
    pub fn new(client: reqwest::Client, promotions_url: String, maven_base: String) -> Self {
        Self {
            client,
            promotions_url,
            maven_base,
        }
    }

    fn forge_artifact(version: &str, classifier: &str) -> MavenArtifact {
        MavenArtifact::new(FORGE_GROUP, FORGE_ARTIFACT, version).with_classifier(classifier)
    }

    /// HEAD the candidate; any failure counts as "not there".
    async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }

    async fn universal_artifact(
        &self,
        minecraft_version: &str,
        forge_id: &str,
    ) -> MavenArtifact {
        let primary = Self::forge_artifact(forge_id, "universal");

        match quirk_for(minecraft_version) {
            Some(ForgeQuirk::DuplicatedVersionSuffix) => {
                if self.exists(&primary.url(&self.maven_base)).await {
                    primary
                } else {
                    let duplicated = format!("{forge_id}-{minecraft_version}");
                    info!(
                        "Forge {} universal jar missing, using {} naming",
                        forge_id, duplicated
                    );
                    Self::forge_artifact(&duplicated, "universal")
                }
            }
            None => primary,
        }
    }
}

#[async_trait]
impl ArtifactResolver for ForgeResolver {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> BundlerResult<ResolvedArtifact> {
        let minecraft = ctx.minecraft_version;
        let parsed = GameVersion::parse(minecraft).ok_or_else(|| {
            BundlerError::unsupported(LoaderType::Forge, minecraft, "not a release version")
        })?;

        let promotions: ForgePromotions =
            get_json(&self.client, &self.promotions_url, "Forge promotions").await?;
        let build = promotions.build_for(minecraft).ok_or_else(|| {
            BundlerError::unsupported(LoaderType::Forge, minecraft, "no promoted Forge build")
        })?;
        let forge_id = format!("{minecraft}-{build}");

        let resolved = match ArtifactScheme::for_version(parsed) {
            ArtifactScheme::Universal => {
                let artifact = self.universal_artifact(minecraft, &forge_id).await;
                debug!("Forge {} resolves to {}", forge_id, artifact);
                ResolvedArtifact::server(artifact.url(&self.maven_base), artifact.filename())
            }
            ArtifactScheme::Installer => {
                let artifact = Self::forge_artifact(&forge_id, "installer");
                warn!(
                    "Forge {} only ships an installer ({}); bundle will need --installServer",
                    forge_id, artifact
                );
                ctx.sink.emit(ProgressEvent::warning(format!(
                    "Forge {forge_id} is distributed as an installer: run it with --installServer before starting the server"
                )));
                ResolvedArtifact::installer(artifact.url(&self.maven_base), artifact.filename())
            }
        };

        info!("Resolved Forge {} -> {}", forge_id, resolved.download_url);
        Ok(resolved)
    }

    async fn list_versions(&self) -> BundlerResult<Vec<String>> {
        let url = MavenArtifact::metadata_url(FORGE_GROUP, FORGE_ARTIFACT, &self.maven_base);
        let xml = get_text(&self.client, &url, "Forge maven metadata").await?;
        let metadata = MavenMetadata::parse(&xml)?;

        let minecraft_versions: BTreeSet<String> = metadata
            .versions()
            .iter()
            .filter_map(|v| v.split('-').next())
            .filter(|v| GameVersion::parse(v).is_some())
            .map(str::to_owned)
            .collect();

        let mut versions: Vec<String> = minecraft_versions.into_iter().collect();
        sort_newest_first(&mut versions);
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::core::build::ArtifactKind;
    use crate::core::config::DownloadSettings;
    use crate::core::downloader::progress::tests::recording_sink;
    use crate::core::downloader::{ProgressLevel, ProgressSink};
    use crate::core::http::build_http_client;

    const PROMOTIONS: &str = r#"{
        "homepage": "https://files.minecraftforge.net/net/minecraftforge/forge/",
        "promos": {
            "1.7.10-latest": "10.13.4.1614",
            "1.12.2-latest": "14.23.5.2860",
            "1.12.2-recommended": "14.23.5.2859",
            "1.20.1-recommended": "47.2.0"
        }
    }"#;

    async fn server_with_promotions() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/promotions_slim.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PROMOTIONS, "application/json"))
            .mount(&server)
            .await;
        server
    }

    fn resolver(server: &MockServer) -> ForgeResolver {
        let client = build_http_client(&DownloadSettings::default()).unwrap();
        ForgeResolver::new(
            client,
            format!("{}/promotions_slim.json", server.uri()),
            server.uri(),
        )
    }

    #[test]
    fn scheme_follows_minor_version() {
        let scheme = |v: &str| ArtifactScheme::for_version(GameVersion::parse(v).unwrap());
        assert_eq!(scheme("1.7.10"), ArtifactScheme::Universal);
        assert_eq!(scheme("1.12.2"), ArtifactScheme::Universal);
        assert_eq!(scheme("1.6.4"), ArtifactScheme::Installer);
        assert_eq!(scheme("1.13.2"), ArtifactScheme::Installer);
        assert_eq!(scheme("1.20.1"), ArtifactScheme::Installer);
    }

    #[test]
    fn quirk_table_lookup() {
        assert_eq!(
            quirk_for("1.7.10"),
            Some(ForgeQuirk::DuplicatedVersionSuffix)
        );
        assert_eq!(quirk_for("1.12.2"), None);
    }

    #[tokio::test]
    async fn universal_uses_latest_promotion() {
        let server = server_with_promotions().await;
        let sink = ProgressSink::noop();

        let artifact = resolver(&server)
            .resolve(&ResolveContext::new("1.12.2", &sink))
            .await
            .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Server);
        assert_eq!(artifact.file_name, "forge-1.12.2-14.23.5.2860-universal.jar");
        assert_eq!(
            artifact.download_url,
            format!(
                "{}/net/minecraftforge/forge/1.12.2-14.23.5.2860/forge-1.12.2-14.23.5.2860-universal.jar",
                server.uri()
            )
        );
    }

    #[tokio::test]
    async fn modern_versions_fall_back_to_recommended_installer_with_warning() {
        let server = server_with_promotions().await;
        let (sink, events) = recording_sink();

        let artifact = resolver(&server)
            .resolve(&ResolveContext::new("1.20.1", &sink))
            .await
            .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Installer);
        assert_eq!(artifact.file_name, "forge-1.20.1-47.2.0-installer.jar");

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, ProgressLevel::Warning);
    }

    #[tokio::test]
    async fn quirk_version_uses_duplicated_suffix_when_plain_name_is_missing() {
        let server = server_with_promotions().await;
        Mock::given(method("HEAD"))
            .and(path(
                "/net/minecraftforge/forge/1.7.10-10.13.4.1614/forge-1.7.10-10.13.4.1614-universal.jar",
            ))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        let sink = ProgressSink::noop();

        let artifact = resolver(&server)
            .resolve(&ResolveContext::new("1.7.10", &sink))
            .await
            .unwrap();

        assert_eq!(
            artifact.file_name,
            "forge-1.7.10-10.13.4.1614-1.7.10-universal.jar"
        );
        assert!(artifact
            .download_url
            .contains("/forge/1.7.10-10.13.4.1614-1.7.10/"));
    }

    #[tokio::test]
    async fn quirk_version_keeps_plain_name_when_it_exists() {
        let server = server_with_promotions().await;
        Mock::given(method("HEAD"))
            .and(path(
                "/net/minecraftforge/forge/1.7.10-10.13.4.1614/forge-1.7.10-10.13.4.1614-universal.jar",
            ))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let sink = ProgressSink::noop();

        let artifact = resolver(&server)
            .resolve(&ResolveContext::new("1.7.10", &sink))
            .await
            .unwrap();
        assert_eq!(artifact.file_name, "forge-1.7.10-10.13.4.1614-universal.jar");
    }

    #[tokio::test]
    async fn unpromoted_version_is_unsupported() {
        let server = server_with_promotions().await;
        let sink = ProgressSink::noop();

        let err = resolver(&server)
            .resolve(&ResolveContext::new("1.6.4", &sink))
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::UnsupportedCombination { .. }));
    }

    #[tokio::test]
    async fn missing_promotions_document_is_provider_unavailable() {
        let server = MockServer::start().await;
        let sink = ProgressSink::noop();

        let err = resolver(&server)
            .resolve(&ResolveContext::new("1.12.2", &sink))
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn lists_game_versions_from_maven_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/net/minecraftforge/forge/maven-metadata.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<metadata><groupId>net.minecraftforge</groupId><artifactId>forge</artifactId>
<versioning><versions>
<version>1.20.1-47.2.0</version>
<version>1.20.1-47.1.0</version>
<version>1.12.2-14.23.5.2859</version>
<version>1.7.10_pre4-10.12.2.1149-prerelease</version>
</versions></versioning></metadata>"#,
                "application/xml",
            ))
            .mount(&server)
            .await;

        let versions = resolver(&server).list_versions().await.unwrap();
        assert_eq!(versions, vec!["1.20.1", "1.12.2"]);
    }
}
