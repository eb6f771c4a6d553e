// ─── Game Version ───
// Numeric (major, minor, patch) view of a Minecraft version string.

use std::fmt;

/// A release version such as `1.20.1` or `1.14` (patch defaults to 0).
///
/// Ordering is lexicographic over the numeric triple, which is what the
/// derived `Ord` gives for the field order below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GameVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `major.minor[.patch]`, ignoring a `-suffix` such as `-pre1`.
    /// Snapshots (`23w45a`) and anything else non-numeric yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let core = raw.trim().split('-').next()?;
        let mut parts = core.split('.');

        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };

        if parts.next().is_some() {
            return None;
        }

        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Loose sort key for arbitrary version strings, newest-first listings.
pub fn version_sort_key(version: &str) -> Vec<u64> {
    version
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Sort newest first and drop duplicates.
pub fn sort_newest_first(versions: &mut Vec<String>) {
    versions.sort_by(|a, b| {
        version_sort_key(b)
            .cmp(&version_sort_key(a))
            .then_with(|| b.cmp(a))
    });
    versions.dedup();
}
