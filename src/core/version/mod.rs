pub mod game_version;
pub mod manifest;
pub mod version_file;

pub use game_version::{sort_newest_first, GameVersion};
pub use manifest::{VersionEntry, VersionManifest};
pub use version_file::{DownloadArtifact, VersionJson};
