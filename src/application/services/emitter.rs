//! Artifact emitter
//!
//! Renders both artifacts, writes them and runs the formatter best-effort.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::NamespaceTree;
use crate::infrastructure::render::{RenderContext, Renderer};
use crate::infrastructure::traits::{CommandRunner, FileSystem};

/// One rendered artifact and its target location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
}

/// The namespace declarations (A) and the build descriptor (B).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    pub namespace: Artifact,
    pub build: Artifact,
}

/// Result of the cosmetic formatter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    Skipped,
    Formatted,
    Failed(String),
}

/// Service turning a namespace tree and path list into files on disk.
pub struct ArtifactEmitter {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    renderer: Arc<dyn Renderer>,
    settings: Arc<Settings>,
}

impl ArtifactEmitter {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        renderer: Arc<dyn Renderer>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            fs,
            cmd,
            renderer,
            settings,
        }
    }

    /// Render both templates; nothing is written.
    pub fn render(
        &self,
        project_dir: &Path,
        tree: &NamespaceTree,
        paths: &[String],
    ) -> ApplicationResult<RenderedArtifacts> {
        let templates = &self.settings.templates;
        let output = &self.settings.output;

        Ok(RenderedArtifacts {
            namespace: Artifact {
                path: project_dir.join(&output.namespace_file),
                content: self.render_one(&templates.namespace, &RenderContext::Namespace(tree))?,
            },
            build: Artifact {
                path: project_dir.join(&output.build_file),
                content: self.render_one(&templates.build, &RenderContext::Paths(paths))?,
            },
        })
    }

    fn render_one(&self, template: &str, context: &RenderContext<'_>) -> ApplicationResult<String> {
        self.renderer
            .render(template, context)
            .map_err(|source| ApplicationError::Render {
                template: template.to_string(),
                source,
            })
    }

    /// Write the namespace artifact, then the build descriptor.
    ///
    /// Not transactional: a failure on the second write leaves the first in place.
    pub fn write(&self, artifacts: &RenderedArtifacts) -> ApplicationResult<()> {
        for artifact in [&artifacts.namespace, &artifacts.build] {
            self.fs
                .ensure_parent(&artifact.path)
                .with_path_context("create output directory for", &artifact.path)?;
            self.fs
                .write(&artifact.path, &artifact.content)
                .with_path_context("write artifact", &artifact.path)?;
            info!(
                "wrote {} ({} bytes)",
                artifact.path.display(),
                artifact.content.len()
            );
        }
        Ok(())
    }

    /// Run the configured formatter in `project_dir`.
    ///
    /// Never fails: problems are logged and returned as `FormatOutcome::Failed`.
    pub fn format(&self, project_dir: &Path) -> FormatOutcome {
        let formatter = &self.settings.formatter;
        if !formatter.enabled {
            debug!("format: disabled");
            return FormatOutcome::Skipped;
        }

        let args: Vec<&str> = formatter.args.iter().map(String::as_str).collect();
        match self.cmd.run_in(project_dir, &formatter.command, &args) {
            Ok(output) if output.status.success() => FormatOutcome::Formatted,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = format!(
                    "{} exited with {}: {}",
                    formatter.command,
                    output.status,
                    stderr.trim()
                );
                warn!("format: {}", reason);
                FormatOutcome::Failed(reason)
            }
            Err(e) => {
                let reason = format!("cannot run {}: {}", formatter.command, e);
                warn!("format: {}", reason);
                FormatOutcome::Failed(reason)
            }
        }
    }
}
