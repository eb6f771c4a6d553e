// ─── Bundler Configuration ───
// Tunables for providers, transfers and archives, persisted as JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{BundlerError, BundlerResult};

const APP_DIR_NAME: &str = "server-bundler";
const CONFIG_FILE: &str = "bundler.json";

/// Delivery channel limit (50MB) minus headroom: 49.5 MiB.
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 99 * 1024 * 1024 / 2;

pub const MIB: usize = 1024 * 1024;

/// Top-level configuration. Every field has a default, so an empty JSON
/// object is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundlerConfig {
    #[serde(default)]
    pub endpoints: ProviderEndpoints,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub archive: ArchiveSettings,
    /// Overall deadline for one build (resolve + download + assemble).
    #[serde(default, with = "optional_duration_secs")]
    pub build_deadline: Option<Duration>,
}

/// Base URLs of the upstream metadata and artifact services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    #[serde(default = "default_fabric_meta")]
    pub fabric_meta: String,
    #[serde(default = "default_forge_promotions")]
    pub forge_promotions: String,
    #[serde(default = "default_forge_maven")]
    pub forge_maven: String,
    #[serde(default = "default_vanilla_manifest")]
    pub vanilla_manifest: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            fabric_meta: default_fabric_meta(),
            forge_promotions: default_forge_promotions(),
            forge_maven: default_forge_maven(),
            vanilla_manifest: default_vanilla_manifest(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every provider at one base URL (a mirror or a mock server),
    /// keeping each provider's path layout.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            fabric_meta: base.to_string(),
            forge_promotions: format!(
                "{base}/net/minecraftforge/forge/promotions_slim.json"
            ),
            forge_maven: base.to_string(),
            vanilla_manifest: format!("{base}/mc/game/version_manifest_v2.json"),
        }
    }
}

/// Transfer behaviour of the resilient downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Total attempts, including the first one (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed wait between attempts (default: 3 s).
    #[serde(default = "default_retry_backoff", with = "duration_millis")]
    pub retry_backoff: Duration,
    /// Accumulation chunk size in bytes (default: 1 MiB).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_connect_timeout", with = "duration_millis")]
    pub connect_timeout: Duration,
    /// Whole-request timeout; generous so large jars on slow hosts finish.
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff: default_retry_backoff(),
            chunk_size: default_chunk_size(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Where the finished archive is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStorage {
    #[default]
    Memory,
    TempFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSettings {
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
    /// Deflate level 0-9 (default: 9). Affects size and CPU only.
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
    #[serde(default)]
    pub storage: ArchiveStorage,
    /// Directory for temp-file storage; system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            max_archive_bytes: default_max_archive_bytes(),
            compression_level: default_compression_level(),
            storage: ArchiveStorage::default(),
            temp_dir: None,
        }
    }
}

impl BundlerConfig {
    /// Default location: `<config_dir>/server-bundler/bundler.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> BundlerResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(BundlerError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: BundlerConfig = serde_json::from_str(&raw)
            .map_err(|e| BundlerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn load_default() -> BundlerResult<Self> {
        Self::load(&Self::default_path())
    }

    pub fn validate(&self) -> BundlerResult<()> {
        if self.download.max_attempts == 0 {
            return Err(BundlerError::Config(
                "download.max_attempts must be at least 1".into(),
            ));
        }
        if self.download.chunk_size == 0 {
            return Err(BundlerError::Config(
                "download.chunk_size must be positive".into(),
            ));
        }
        if !(0..=9).contains(&self.archive.compression_level) {
            return Err(BundlerError::Config(format!(
                "archive.compression_level must be 0-9, got {}",
                self.archive.compression_level
            )));
        }
        if self.archive.max_archive_bytes == 0 {
            return Err(BundlerError::Config(
                "archive.max_archive_bytes must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_fabric_meta() -> String {
    "https://meta.fabricmc.net".to_string()
}

fn default_forge_promotions() -> String {
    "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json".to_string()
}

fn default_forge_maven() -> String {
    "https://maven.minecraftforge.net".to_string()
}

fn default_vanilla_manifest() -> String {
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(3)
}

fn default_chunk_size() -> usize {
    MIB
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_user_agent() -> String {
    concat!("server-bundler/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_archive_bytes() -> u64 {
    DEFAULT_MAX_ARCHIVE_BYTES
}

fn default_compression_level() -> i64 {
    9
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
