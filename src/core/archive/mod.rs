mod assembler;
mod location;

pub use assembler::{compression_ratio_percent, ArchiveAssembler, AssembledArchive, BundleFiles};
pub use location::ArchiveLocation;
