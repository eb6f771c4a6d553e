mod model;

pub use model::{
    ArtifactKind, BuildId, BuildRequest, BuildResult, BuildState, LoaderType, ResolvedArtifact,
};
