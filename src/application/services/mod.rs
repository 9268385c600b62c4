//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner, Renderer)
//! but are themselves concrete structs, not traits.

mod discovery;
mod emitter;
mod generate;

pub use discovery::DiscoveryService;
pub use emitter::{Artifact, ArtifactEmitter, FormatOutcome, RenderedArtifacts};
pub use generate::{GenerateOptions, GenerateReport, GenerateService, GenerationPlan};
