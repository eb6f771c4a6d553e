mod orchestrator;

pub use orchestrator::BuildPipeline;
