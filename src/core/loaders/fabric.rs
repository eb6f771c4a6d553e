use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::context::ResolveContext;
use super::resolver::ArtifactResolver;
use crate::core::build::{LoaderType, ResolvedArtifact};
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::http::get_json;
use crate::core::version::{sort_newest_first, GameVersion};

/// Fabric has no server support before 1.14.
pub const FABRIC_MIN_VERSION: GameVersion = GameVersion::new(1, 14, 0);

#[derive(Debug, Deserialize)]
struct FabricLoaderEntry {
    version: String,
}

#[derive(Debug, Deserialize)]
struct FabricInstallerEntry {
    version: String,
}

#[derive(Debug, Deserialize)]
struct FabricGameEntry {
    version: String,
    #[serde(default)]
    stable: bool,
}

/// Resolves the Fabric server launcher jar through Fabric Meta.
pub struct FabricResolver {
    client: reqwest::Client,
    meta_base: String,
}

impl FabricResolver {
    pub fn new(client: reqwest::Client, meta_base: String) -> Self {
        Self {
            client,
            meta_base: meta_base.trim_end_matches('/').to_string(),
        }
    }

    /// Rejects versions below the floor before any request is made.
    fn check_supported(minecraft_version: &str) -> BundlerResult<GameVersion> {
        let parsed = GameVersion::parse(minecraft_version).ok_or_else(|| {
            BundlerError::unsupported(
                LoaderType::Fabric,
                minecraft_version,
                "not a release version",
            )
        })?;

        if parsed < FABRIC_MIN_VERSION {
            return Err(BundlerError::unsupported(
                LoaderType::Fabric,
                minecraft_version,
                format!("Fabric requires Minecraft {FABRIC_MIN_VERSION} or newer"),
            ));
        }

        Ok(parsed)
    }

    /// Latest loader build; Fabric Meta lists newest first.
    async fn latest_loader(&self) -> BundlerResult<String> {
        let url = format!("{}/v2/versions/loader", self.meta_base);
        let entries: Vec<FabricLoaderEntry> =
            get_json(&self.client, &url, "Fabric Meta (loader)").await?;

        entries.into_iter().next().map(|e| e.version).ok_or_else(|| {
            BundlerError::ProviderUnavailable("Fabric Meta returned no loader builds".into())
        })
    }

    async fn latest_installer(&self) -> BundlerResult<String> {
        let url = format!("{}/v2/versions/installer", self.meta_base);
        let entries: Vec<FabricInstallerEntry> =
            get_json(&self.client, &url, "Fabric Meta (installer)").await?;

        entries.into_iter().next().map(|e| e.version).ok_or_else(|| {
            BundlerError::ProviderUnavailable("Fabric Meta returned no installer builds".into())
        })
    }

    fn server_jar_url(&self, minecraft: &str, loader: &str, installer: &str) -> String {
        format!(
            "{}/v2/versions/loader/{}/{}/{}/server/jar",
            self.meta_base, minecraft, loader, installer
        )
    }
}

#[async_trait]
impl ArtifactResolver for FabricResolver {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> BundlerResult<ResolvedArtifact> {
        let minecraft = ctx.minecraft_version;
        Self::check_supported(minecraft)?;

        let loader = self.latest_loader().await?;
        let installer = self.latest_installer().await?;

        info!(
            "Resolved Fabric {} (loader {}, installer {})",
            minecraft, loader, installer
        );

        Ok(ResolvedArtifact::server(
            self.server_jar_url(minecraft, &loader, &installer),
            format!("fabric-server-mc.{minecraft}-loader.{loader}-launcher.{installer}.jar"),
        ))
    }

    async fn list_versions(&self) -> BundlerResult<Vec<String>> {
        let url = format!("{}/v2/versions/game", self.meta_base);
        let entries: Vec<FabricGameEntry> =
            get_json(&self.client, &url, "Fabric Meta (game)").await?;

        let mut versions: Vec<String> = entries
            .into_iter()
            .filter(|e| e.stable)
            .filter(|e| Self::check_supported(&e.version).is_ok())
            .map(|e| e.version)
            .collect();
        sort_newest_first(&mut versions);
        Ok(versions)
    }
}
