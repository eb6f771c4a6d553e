mod artifact;
mod metadata;

pub use artifact::MavenArtifact;
pub use metadata::MavenMetadata;

pub const FORGE_GROUP: &str = "net.minecraftforge";
pub const FORGE_ARTIFACT: &str = "forge";
