// ─── Server Bundler Core ───
// Builds ready-to-run Minecraft server bundles.
//
// Architecture:
//   core/
//     build/        Request, artifact, state and result types
//     config.rs     JSON configuration with per-field defaults
//     version/      Mojang manifest, version JSON, version parsing
//     maven/        Maven coordinates + maven-metadata.xml
//     loaders/      Vanilla, Fabric, Forge artifact resolvers
//     downloader/   Streaming download with retries and progress
//     server_files/ server.properties, start scripts, README, EULA
//     archive/      Zip assembly with a size ceiling
//     pipeline/     Orchestrates one build end to end
//     state/        Per-process context and per-requester build guard

pub mod archive;
pub mod build;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod loaders;
pub mod maven;
pub mod pipeline;
pub mod server_files;
pub mod state;
pub mod version;
