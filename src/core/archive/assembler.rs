use std::collections::HashMap;
use std::io::{Cursor, Seek, SeekFrom, Write};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::location::ArchiveLocation;
use crate::core::config::{ArchiveSettings, ArchiveStorage};
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::server_files::{
    synthesize_eula, synthesize_properties, synthesize_readme, synthesize_start_scripts,
    ServerSettings,
};

/// Text members of a bundle, in archive order after the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFiles {
    pub properties: String,
    pub eula: String,
    pub start_sh: String,
    pub start_bat: String,
    pub readme: String,
}

impl BundleFiles {
    pub fn synthesize(artifact_name: &str, settings: &HashMap<String, String>) -> Self {
        let ram_mb = ServerSettings::new(settings).ram_mb();
        let (start_sh, start_bat) = synthesize_start_scripts(artifact_name, ram_mb);

        Self {
            properties: synthesize_properties(settings),
            eula: synthesize_eula(),
            start_sh,
            start_bat,
            readme: synthesize_readme(settings, artifact_name),
        }
    }
}

/// A written, size-checked archive.
#[derive(Debug)]
pub struct AssembledArchive {
    pub location: ArchiveLocation,
    pub size_bytes: u64,
    pub original_artifact_size_bytes: u64,
    pub compression_ratio_percent: f64,
    /// Hex-encoded SHA-256 of the archive bytes.
    pub sha256: String,
}

/// `100 * (1 - archive / original)`, 0 for an empty original.
pub fn compression_ratio_percent(archive: u64, original: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    100.0 * (1.0 - archive as f64 / original as f64)
}

/// Writes bundles as deflate zips with fixed entry timestamps.
#[derive(Debug, Clone)]
pub struct ArchiveAssembler {
    settings: ArchiveSettings,
    temp_prefix: String,
}

impl ArchiveAssembler {
    pub fn new(settings: ArchiveSettings) -> Self {
        Self {
            settings,
            temp_prefix: "server-bundle-".to_string(),
        }
    }

    /// Prefix for temp-file archives, so leftovers can be traced to a build.
    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    /// Synthesize the text members and assemble in one step.
    pub async fn assemble(
        &self,
        artifact: Vec<u8>,
        artifact_name: &str,
        settings: &HashMap<String, String>,
    ) -> BundlerResult<AssembledArchive> {
        let files = BundleFiles::synthesize(artifact_name, settings);
        self.assemble_files(artifact, artifact_name, files).await
    }

    /// Compress on the blocking pool, then enforce the ceiling. An oversize
    /// archive is dropped (and its temp file deleted) before the error.
    pub async fn assemble_files(
        &self,
        artifact: Vec<u8>,
        artifact_name: &str,
        files: BundleFiles,
    ) -> BundlerResult<AssembledArchive> {
        let original = artifact.len() as u64;
        let settings = self.settings.clone();
        let temp_prefix = self.temp_prefix.clone();
        let artifact_name = artifact_name.to_string();

        let (location, size_bytes, sha256) = tokio::task::spawn_blocking(move || {
            write_archive(&settings, &temp_prefix, &artifact, &artifact_name, &files)
        })
        .await
        .map_err(|e| BundlerError::AssemblyFailed(format!("Task join error: {e}")))??;

        let limit = self.settings.max_archive_bytes;
        if size_bytes > limit {
            warn!(
                "Archive is {} bytes, over the {} byte ceiling; discarding",
                size_bytes, limit
            );
            drop(location);
            return Err(BundlerError::ArchiveTooLarge {
                size: size_bytes,
                limit,
            });
        }

        let ratio = compression_ratio_percent(size_bytes, original);
        info!(
            "Archive assembled: {} bytes from {} byte artifact ({:.1}% saved)",
            size_bytes, original, ratio
        );

        Ok(AssembledArchive {
            location,
            size_bytes,
            original_artifact_size_bytes: original,
            compression_ratio_percent: ratio,
            sha256,
        })
    }
}

fn write_archive(
    settings: &ArchiveSettings,
    temp_prefix: &str,
    artifact: &[u8],
    artifact_name: &str,
    files: &BundleFiles,
) -> BundlerResult<(ArchiveLocation, u64, String)> {
    match settings.storage {
        ArchiveStorage::Memory => {
            let cursor = write_zip(
                Cursor::new(Vec::new()),
                settings.compression_level,
                artifact,
                artifact_name,
                files,
            )?;
            let bytes = cursor.into_inner();
            let size = bytes.len() as u64;
            let sha256 = hex::encode(Sha256::digest(&bytes));
            Ok((ArchiveLocation::Memory(bytes), size, sha256))
        }
        ArchiveStorage::TempFile => {
            let mut builder = tempfile::Builder::new();
            builder.prefix(temp_prefix).suffix(".zip");
            let file = match &settings.temp_dir {
                Some(dir) => builder.tempfile_in(dir),
                None => builder.tempfile(),
            }
            .map_err(|e| BundlerError::AssemblyFailed(format!("Cannot create temp file: {e}")))?;
            debug!("Writing archive to {:?}", file.path());

            let mut file = write_zip(
                file,
                settings.compression_level,
                artifact,
                artifact_name,
                files,
            )?;
            let mut hasher = Sha256::new();
            let size = file
                .seek(SeekFrom::Start(0))
                .and_then(|_| std::io::copy(&mut file, &mut hasher))
                .map_err(|e| BundlerError::AssemblyFailed(format!("Cannot hash archive: {e}")))?;
            let sha256 = hex::encode(hasher.finalize());
            Ok((ArchiveLocation::TempFile(file), size, sha256))
        }
    }
}

fn write_zip<W: Write + Seek>(
    writer: W,
    level: i64,
    artifact: &[u8],
    artifact_name: &str,
    files: &BundleFiles,
) -> BundlerResult<W> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level))
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);
    let executable = options.unix_permissions(0o755);

    let members: [(&str, &[u8], SimpleFileOptions); 8] = [
        (artifact_name, artifact, options),
        ("server.properties", files.properties.as_bytes(), options),
        ("eula.txt", files.eula.as_bytes(), options),
        ("start.sh", files.start_sh.as_bytes(), executable),
        ("start.bat", files.start_bat.as_bytes(), options),
        ("README.txt", files.readme.as_bytes(), options),
        ("ops.json", b"[]", options),
        ("whitelist.json", b"[]", options),
    ];

    let mut zip = ZipWriter::new(writer);
    for (name, content, opts) in members {
        zip.start_file(name, opts)
            .map_err(|e| BundlerError::AssemblyFailed(format!("{name}: {e}")))?;
        zip.write_all(content)
            .map_err(|e| BundlerError::AssemblyFailed(format!("{name}: {e}")))?;
    }

    zip.finish()
        .map_err(|e| BundlerError::AssemblyFailed(format!("Cannot finalize archive: {e}")))
}
