use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::config::DownloadSettings;
use crate::core::error::{BundlerError, BundlerResult};

const MAX_REDIRECTS: usize = 10;

/// Shared client for metadata lookups and artifact transfers.
///
/// Artifacts are already compressed jars, so content encoding is pinned to
/// `identity` to keep `Content-Length` meaningful for progress reporting.
pub fn build_http_client(settings: &DownloadSettings) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(default_headers)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
}

/// GET `url` and decode it as JSON. Connection failures, non-2xx statuses
/// and malformed bodies all surface as `ProviderUnavailable`.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    provider: &str,
) -> BundlerResult<T> {
    let body = get_text(client, url, provider).await?;
    serde_json::from_str(&body).map_err(|e| {
        BundlerError::ProviderUnavailable(format!("{provider} returned malformed JSON: {e}"))
    })
}

/// GET `url` as text with the same error mapping as [`get_json`].
pub async fn get_text(client: &Client, url: &str, provider: &str) -> BundlerResult<String> {
    debug!("GET {} ({})", url, provider);

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| BundlerError::ProviderUnavailable(format!("{provider} unreachable: {e}")))?;

    if !resp.status().is_success() {
        return Err(BundlerError::ProviderUnavailable(format!(
            "{} returned {} for {}",
            provider,
            resp.status(),
            url
        )));
    }

    resp.text()
        .await
        .map_err(|e| BundlerError::ProviderUnavailable(format!("{provider} read failed: {e}")))
}
