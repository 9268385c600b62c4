//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::GenerateService;
use crate::config::Settings;
use crate::infrastructure::render::{BuiltinRenderer, Renderer};
use crate::infrastructure::traits::{CommandRunner, FileSystem, RealCommandRunner, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Template renderer
    pub renderer: Arc<dyn Renderer>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let renderer = Arc::new(BuiltinRenderer::new(settings.codegen.clone()));
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
            renderer,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            cmd,
            renderer,
        }
    }

    /// Generation pipeline wired with this container's dependencies.
    pub fn generate_service(&self) -> GenerateService {
        GenerateService::new(
            self.fs.clone(),
            self.cmd.clone(),
            self.renderer.clone(),
            self.settings.clone(),
        )
    }
}
