use async_trait::async_trait;
use tracing::info;

use super::context::ResolveContext;
use super::resolver::ArtifactResolver;
use crate::core::build::{LoaderType, ResolvedArtifact};
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::version::{sort_newest_first, VersionJson, VersionManifest};

/// Resolves the official dedicated server jar through Mojang's manifest.
pub struct VanillaResolver {
    client: reqwest::Client,
    manifest_url: String,
}

impl VanillaResolver {
    pub fn new(client: reqwest::Client, manifest_url: String) -> Self {
        Self {
            client,
            manifest_url,
        }
    }
}

#[async_trait]
impl ArtifactResolver for VanillaResolver {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> BundlerResult<ResolvedArtifact> {
        let minecraft = ctx.minecraft_version;
        let manifest = VersionManifest::fetch(&self.client, &self.manifest_url).await?;

        let entry = manifest.find_version(minecraft).ok_or_else(|| {
            BundlerError::unsupported(LoaderType::Vanilla, minecraft, "not in the version manifest")
        })?;

        let version_json = VersionJson::fetch(&self.client, &entry.url).await?;
        let server = version_json.server_download().ok_or_else(|| {
            BundlerError::unsupported(
                LoaderType::Vanilla,
                minecraft,
                "no dedicated server download published",
            )
        })?;

        info!(
            "Resolved vanilla {} -> {} ({} bytes)",
            minecraft, server.url, server.size
        );

        Ok(ResolvedArtifact {
            sha1: Some(server.sha1.clone()),
            size: Some(server.size),
            ..ResolvedArtifact::server(
                server.url.clone(),
                format!("minecraft_server.{minecraft}.jar"),
            )
        })
    }

    async fn list_versions(&self) -> BundlerResult<Vec<String>> {
        let manifest = VersionManifest::fetch(&self.client, &self.manifest_url).await?;
        let mut versions: Vec<String> =
            manifest.releases().into_iter().map(|v| v.id.clone()).collect();
        sort_newest_first(&mut versions);
        Ok(versions)
    }
}
