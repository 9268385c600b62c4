//! Generation pipeline
//!
//! discovery → parse → exclusion → namespace tree → render → write → format.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::discovery::DiscoveryService;
use crate::application::services::emitter::{ArtifactEmitter, FormatOutcome, RenderedArtifacts};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{
    classify, collect_identifiers, collect_paths, ClassificationStats, ExclusionFilter,
    NamespaceTree, PackageRow,
};
use crate::infrastructure::render::Renderer;
use crate::infrastructure::traits::{CommandRunner, FileSystem};

/// Everything derived from one discovery run, before any output is written.
#[derive(Debug)]
pub struct GenerationPlan {
    pub rows: Vec<PackageRow>,
    /// Source paths in row order, one per row
    pub paths: Vec<String>,
    pub tree: NamespaceTree,
    pub stats: ClassificationStats,
    /// Identifiers removed by the denylist
    pub excluded: usize,
}

/// Switches for a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Render but do not write or format
    pub dry_run: bool,
    /// Run the formatter after writing (if enabled in settings)
    pub format: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            format: true,
        }
    }
}

/// Summary of a generation run.
#[derive(Debug)]
pub struct GenerateReport {
    pub rows: usize,
    pub stats: ClassificationStats,
    pub excluded: usize,
    pub artifacts: RenderedArtifacts,
    /// Paths actually written (empty on dry run)
    pub written: Vec<PathBuf>,
    pub format: FormatOutcome,
}

/// Service running the whole pre-build generation.
pub struct GenerateService {
    discovery: DiscoveryService,
    emitter: ArtifactEmitter,
    settings: Arc<Settings>,
}

impl GenerateService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        renderer: Arc<dyn Renderer>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            discovery: DiscoveryService::new(cmd.clone(), settings.clone()),
            emitter: ArtifactEmitter::new(fs, cmd, renderer, settings.clone()),
            settings,
        }
    }

    /// Discover packages and build the namespace tree.
    ///
    /// All precondition failures (malformed rows or identifiers, missing
    /// denylist entries) surface here, before anything is written.
    #[instrument(level = "debug", skip(self))]
    pub fn plan(&self, project_dir: &Path) -> ApplicationResult<GenerationPlan> {
        let rows = self.discovery.discover(project_dir)?;
        Self::plan_from_rows(rows, &self.settings.exclude)
    }

    /// Build a plan from already parsed rows.
    pub fn plan_from_rows(
        rows: Vec<PackageRow>,
        exclude: &[String],
    ) -> ApplicationResult<GenerationPlan> {
        let paths = collect_paths(&rows);
        let identifiers = collect_identifiers(&rows);

        let filter = ExclusionFilter::from_strings(exclude)?;
        let before = identifiers.len();
        let identifiers = filter.apply(identifiers)?;
        let excluded = before - identifiers.len();

        let classified = classify(&identifiers);
        let stats = ClassificationStats::from_classified(&classified);
        debug!(
            "plan: {} leaves, {} parents, {} duplicates, {} excluded",
            stats.leaves, stats.parents, stats.duplicates, excluded
        );
        let tree = NamespaceTree::from_classified(&classified);

        Ok(GenerationPlan {
            rows,
            paths,
            tree,
            stats,
            excluded,
        })
    }

    /// Run the full pipeline.
    #[instrument(level = "debug", skip(self))]
    pub fn generate(
        &self,
        project_dir: &Path,
        options: GenerateOptions,
    ) -> ApplicationResult<GenerateReport> {
        let plan = self.plan(project_dir)?;
        let artifacts = self.emitter.render(project_dir, &plan.tree, &plan.paths)?;

        let (written, format) = if options.dry_run {
            info!("dry run: nothing written");
            (Vec::new(), FormatOutcome::Skipped)
        } else {
            self.emitter.write(&artifacts)?;
            let format = if options.format {
                self.emitter.format(project_dir)
            } else {
                FormatOutcome::Skipped
            };
            (
                vec![artifacts.namespace.path.clone(), artifacts.build.path.clone()],
                format,
            )
        };

        Ok(GenerateReport {
            rows: plan.rows.len(),
            stats: plan.stats,
            excluded: plan.excluded,
            artifacts,
            written,
            format,
        })
    }
}
