mod client;
pub(crate) mod progress;

pub use client::Downloader;
pub use progress::{ProgressEvent, ProgressLevel, ProgressPhase, ProgressSink};
