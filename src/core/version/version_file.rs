// ─── Version File ───
// The slice of a Mojang per-version JSON the bundler needs: the
// dedicated server download.

use serde::Deserialize;

use crate::core::error::BundlerResult;
use crate::core::http::get_json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

impl VersionJson {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> BundlerResult<Self> {
        get_json(client, url, "Mojang version metadata").await
    }

    /// The dedicated server jar, absent for very old versions.
    pub fn server_download(&self) -> Option<&DownloadArtifact> {
        self.downloads.as_ref().and_then(|d| d.server.as_ref())
    }
}
