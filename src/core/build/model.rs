use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::archive::ArchiveLocation;

/// Supported server loaders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    Vanilla,
    Fabric,
    Forge,
}

impl fmt::Display for LoaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderType::Vanilla => write!(f, "vanilla"),
            LoaderType::Fabric => write!(f, "fabric"),
            LoaderType::Forge => write!(f, "forge"),
        }
    }
}

impl FromStr for LoaderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(LoaderType::Vanilla),
            "fabric" => Ok(LoaderType::Fabric),
            "forge" => Ok(LoaderType::Forge),
            other => Err(format!("unknown loader '{other}'")),
        }
    }
}

/// One build request. Immutable for the duration of a build.
///
/// `settings` carries every server parameter as a string; unknown keys are
/// ignored and missing keys fall back to the defaults in
/// [`crate::core::server_files::ServerSettings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    pub loader: LoaderType,
    pub version: String,
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl BuildRequest {
    pub fn new(loader: LoaderType, version: impl Into<String>) -> Self {
        Self {
            loader,
            version: version.into(),
            settings: HashMap::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// File name the finished bundle is delivered under.
    pub fn archive_name(&self) -> String {
        format!("{}-{}-server.zip", self.loader, self.version.trim())
    }
}

/// What the downloaded file actually is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A runnable server jar.
    Server,
    /// An installer that must be run once to produce the server.
    Installer,
}

/// Concrete download location produced by a resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub download_url: String,
    pub file_name: String,
    pub kind: ArtifactKind,
    /// Published SHA-1, when the provider exposes one.
    pub sha1: Option<String>,
    /// Published size in bytes, when the provider exposes one.
    pub size: Option<u64>,
}

impl ResolvedArtifact {
    pub fn server(download_url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            file_name: file_name.into(),
            kind: ArtifactKind::Server,
            sha1: None,
            size: None,
        }
    }

    pub fn installer(download_url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Installer,
            ..Self::server(download_url, file_name)
        }
    }
}

/// Lifecycle of a single build. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Idle,
    Resolving,
    Downloading,
    Synthesizing,
    Assembling,
    Done,
    Failed,
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Done | BuildState::Failed)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Idle => "idle",
            BuildState::Resolving => "resolving",
            BuildState::Downloading => "downloading",
            BuildState::Synthesizing => "synthesizing",
            BuildState::Assembling => "assembling",
            BuildState::Done => "done",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Identifier attached to every build for logs and temp file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(pub Uuid);

impl BuildId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Successful build output. Owned by the caller; a temp file backing
/// `archive` is removed when it is dropped without being persisted.
#[derive(Debug)]
pub struct BuildResult {
    pub id: BuildId,
    pub archive: ArchiveLocation,
    pub archive_name: String,
    pub archive_size_bytes: u64,
    pub original_artifact_size_bytes: u64,
    pub compression_ratio_percent: f64,
    /// Hex-encoded SHA-256 of the finished archive.
    pub archive_sha256: String,
    pub artifact: ResolvedArtifact,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
