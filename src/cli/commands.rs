//! Command dispatch
//!
//! Loads settings, wires services and renders results for the terminal.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{FormatOutcome, GenerateOptions, GenerateReport};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, project_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Root label of the displayed namespace tree
const TREE_ROOT_LABEL: &str = "crate";

#[instrument(level = "debug", skip(cli))]
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    debug!("project dir: {}", project_dir.display());

    match &cli.command {
        None => cmd_generate(&project_dir, GenerateOptions::default()),
        Some(Commands::Generate { dry_run, no_fmt }) => cmd_generate(
            &project_dir,
            GenerateOptions {
                dry_run: *dry_run,
                format: !no_fmt,
            },
        ),
        Some(Commands::Tree { toml }) => cmd_tree(&project_dir, *toml),
        Some(Commands::Paths) => cmd_paths(&project_dir),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cmd_config_show(&project_dir),
            ConfigCommands::Init { global, force } => cmd_config_init(&project_dir, *global, *force),
            ConfigCommands::Path => cmd_config_path(&project_dir),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn resolve_project_dir(project_dir: Option<&Path>) -> CliResult<PathBuf> {
    let dir = match project_dir {
        Some(dir) => dir.to_path_buf(),
        None => env::current_dir()
            .map_err(|e| CliError::Usage(format!("cannot determine current directory: {e}")))?,
    };
    if !dir.is_dir() {
        return Err(CliError::InvalidArgs(format!(
            "project directory does not exist: {}",
            dir.display()
        )));
    }
    Ok(dir)
}

fn container(project_dir: &Path) -> CliResult<ServiceContainer> {
    let settings = Settings::load(Some(project_dir))?;
    Ok(ServiceContainer::new(settings))
}

fn cmd_generate(project_dir: &Path, options: GenerateOptions) -> CliResult<()> {
    let container = container(project_dir)?;
    let report = container.generate_service().generate(project_dir, options)?;

    if options.dry_run {
        print_dry_run(&report);
    } else {
        output::success(&format!(
            "generated {}",
            report.written.iter().map(|p| p.display()).join(", ")
        ));
    }
    output::detail(&format!(
        "{} packages: {} leaves, {} parents, {} duplicates, {} excluded",
        report.rows,
        report.stats.leaves,
        report.stats.parents,
        report.stats.duplicates,
        report.excluded
    ));

    match &report.format {
        FormatOutcome::Formatted => output::detail(&"formatted"),
        FormatOutcome::Skipped => {}
        FormatOutcome::Failed(reason) => {
            output::warning(&format!("formatter failed, output left unformatted: {reason}"))
        }
    }
    Ok(())
}

fn print_dry_run(report: &GenerateReport) {
    for artifact in [&report.artifacts.namespace, &report.artifacts.build] {
        output::header(&format!("==> {} <==", artifact.path.display()));
        output::info(&artifact.content);
    }
}

fn cmd_tree(project_dir: &Path, as_toml: bool) -> CliResult<()> {
    let container = container(project_dir)?;
    let plan = container.generate_service().plan(project_dir)?;

    if as_toml {
        let rendered =
            toml::to_string_pretty(&plan.tree).map_err(|e| ApplicationError::OperationFailed {
                context: "serialize namespace tree".to_string(),
                source: Box::new(e),
            })?;
        output::info(&rendered.trim_end());
    } else {
        output::info(&plan.tree.to_termtree(TREE_ROOT_LABEL));
    }
    Ok(())
}

fn cmd_paths(project_dir: &Path) -> CliResult<()> {
    let container = container(project_dir)?;
    let plan = container.generate_service().plan(project_dir)?;
    if !plan.paths.is_empty() {
        output::info(&plan.paths.iter().join("\n"));
    }
    Ok(())
}

fn cmd_config_show(project_dir: &Path) -> CliResult<()> {
    let settings = Settings::load(Some(project_dir))?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(project_dir: &Path, global: bool, force: bool) -> CliResult<()> {
    let path = if global {
        global_config_path()
            .ok_or_else(|| CliError::Usage("cannot determine global config directory".into()))?
    } else {
        project_config_path(project_dir)
    };

    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "config already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            InfraError::io(format!("create config directory: {}", parent.display()), e)
        })?;
    }
    std::fs::write(&path, Settings::template())
        .map_err(|e| InfraError::io(format!("write config: {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}

fn cmd_config_path(project_dir: &Path) -> CliResult<()> {
    let marker = |p: &Path| if p.exists() { "" } else { " (not found)" };

    match global_config_path() {
        Some(path) => output::info(&format!("global:  {}{}", path.display(), marker(&path))),
        None => output::info(&"global:  (no config directory)"),
    }
    let project = project_config_path(project_dir);
    output::info(&format!("project: {}{}", project.display(), marker(&project)));
    Ok(())
}
