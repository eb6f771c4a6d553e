pub mod context;
pub mod fabric;
pub mod forge;
pub mod resolver;
pub mod vanilla;

pub use context::ResolveContext;
pub use resolver::{ArtifactResolver, Resolver};
