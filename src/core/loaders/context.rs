use crate::core::downloader::ProgressSink;

/// Everything a resolver needs for one lookup.
/// Grows without breaking the resolver API.
pub struct ResolveContext<'a> {
    pub minecraft_version: &'a str,
    pub sink: &'a ProgressSink,
}

impl<'a> ResolveContext<'a> {
    pub fn new(minecraft_version: &'a str, sink: &'a ProgressSink) -> Self {
        Self {
            minecraft_version: minecraft_version.trim(),
            sink,
        }
    }
}
