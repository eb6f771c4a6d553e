use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::error::{BundlerError, BundlerResult};

/// Where a finished archive lives.
///
/// A `TempFile` is removed from disk when the value is dropped, unless it
/// was handed off with [`ArchiveLocation::persist`].
pub enum ArchiveLocation {
    Memory(Vec<u8>),
    TempFile(NamedTempFile),
}

impl ArchiveLocation {
    /// Backing path for temp-file archives.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArchiveLocation::Memory(_) => None,
            ArchiveLocation::TempFile(file) => Some(file.path()),
        }
    }

    /// Load the archive into memory.
    pub fn into_bytes(self) -> BundlerResult<Vec<u8>> {
        match self {
            ArchiveLocation::Memory(bytes) => Ok(bytes),
            ArchiveLocation::TempFile(file) => {
                std::fs::read(file.path()).map_err(|source| BundlerError::Io {
                    path: file.path().to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Move the archive to `dest`. Temp files are renamed when possible and
    /// copied when the rename crosses filesystems.
    pub fn persist(self, dest: &Path) -> BundlerResult<PathBuf> {
        let io_err = |source| BundlerError::Io {
            path: dest.to_path_buf(),
            source,
        };

        match self {
            ArchiveLocation::Memory(bytes) => {
                std::fs::write(dest, bytes).map_err(io_err)?;
            }
            ArchiveLocation::TempFile(file) => {
                if let Err(e) = file.persist(dest) {
                    debug!("Rename to {:?} failed ({}), copying instead", dest, e.error);
                    std::fs::copy(e.file.path(), dest).map_err(io_err)?;
                }
            }
        }

        Ok(dest.to_path_buf())
    }
}

impl fmt::Debug for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveLocation::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            ArchiveLocation::TempFile(file) => write!(f, "TempFile({:?})", file.path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn dropping_temp_file_removes_it() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"zip").unwrap();
        let location = ArchiveLocation::TempFile(file);
        let path = location.path().unwrap().to_path_buf();
        assert!(path.exists());

        drop(location);
        assert!(!path.exists());
    }

    #[test]
    fn persist_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = NamedTempFile::new_in(dir.path()).unwrap();
        file.write_all(b"zip").unwrap();

        let dest = dir.path().join("bundle.zip");
        ArchiveLocation::TempFile(file).persist(&dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"zip");

        let dest = dir.path().join("memory.zip");
        ArchiveLocation::Memory(b"mem".to_vec()).persist(&dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"mem");
    }
}
