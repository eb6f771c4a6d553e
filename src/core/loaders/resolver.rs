use async_trait::async_trait;

use crate::core::build::{LoaderType, ResolvedArtifact};
use crate::core::config::ProviderEndpoints;
use crate::core::error::BundlerResult;

use super::{
    context::ResolveContext, fabric::FabricResolver, forge::ForgeResolver,
    vanilla::VanillaResolver,
};

/// Maps a game version to a concrete server artifact for one loader.
///
/// Implementations issue only the metadata requests their protocol needs
/// and never retry them; byte transfer retries live in the downloader.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> BundlerResult<ResolvedArtifact>;

    /// Game versions this loader can produce a bundle for, newest first.
    async fn list_versions(&self) -> BundlerResult<Vec<String>>;
}

/// Static dispatch, one variant per loader. A new provider is a new variant.
pub enum Resolver {
    Vanilla(VanillaResolver),
    Fabric(FabricResolver),
    Forge(ForgeResolver),
}

impl Resolver {
    pub fn new(loader: LoaderType, client: reqwest::Client, endpoints: &ProviderEndpoints) -> Self {
        match loader {
            LoaderType::Vanilla => Self::Vanilla(VanillaResolver::new(
                client,
                endpoints.vanilla_manifest.clone(),
            )),
            LoaderType::Fabric => {
                Self::Fabric(FabricResolver::new(client, endpoints.fabric_meta.clone()))
            }
            LoaderType::Forge => Self::Forge(ForgeResolver::new(
                client,
                endpoints.forge_promotions.clone(),
                endpoints.forge_maven.clone(),
            )),
        }
    }

    pub async fn resolve(&self, ctx: &ResolveContext<'_>) -> BundlerResult<ResolvedArtifact> {
        match self {
            Resolver::Vanilla(r) => r.resolve(ctx).await,
            Resolver::Fabric(r) => r.resolve(ctx).await,
            Resolver::Forge(r) => r.resolve(ctx).await,
        }
    }

    pub async fn list_versions(&self) -> BundlerResult<Vec<String>> {
        match self {
            Resolver::Vanilla(r) => r.list_versions().await,
            Resolver::Fabric(r) => r.list_versions().await,
            Resolver::Forge(r) => r.list_versions().await,
        }
    }
}
