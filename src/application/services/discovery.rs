//! Discovery service
//!
//! Runs the external discovery command and parses its rows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{parse_rows, PackageRow};
use crate::infrastructure::traits::CommandRunner;

/// Service invoking the discovery collaborator.
pub struct DiscoveryService {
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
}

impl DiscoveryService {
    pub fn new(cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self { cmd, settings }
    }

    /// Run discovery in `project_dir` and parse the buffered output.
    pub fn discover(&self, project_dir: &Path) -> ApplicationResult<Vec<PackageRow>> {
        let stdout = self.run(project_dir)?;
        let rows = parse_rows(&stdout)?;
        info!("discovery: {} rows", rows.len());
        Ok(rows)
    }

    /// Run the discovery command, returning its complete stdout.
    ///
    /// Spawn failures, non-zero exit and non-UTF-8 output are fatal.
    pub fn run(&self, project_dir: &Path) -> ApplicationResult<String> {
        let command = self.resolve_command(project_dir);
        let command = command.to_string_lossy();
        let args: Vec<&str> = self.settings.discovery.args.iter().map(String::as_str).collect();
        debug!(
            "discovery: running {} {:?} in {}",
            command,
            args,
            project_dir.display()
        );

        let output = self
            .cmd
            .run_in(project_dir, &command, &args)
            .map_err(|e| ApplicationError::OperationFailed {
                context: format!("run discovery command: {command}"),
                source: Box::new(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApplicationError::Discovery {
                command: command.to_string(),
                message: stderr.trim().to_string(),
                exit_code: output.status.code(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ApplicationError::OperationFailed {
            context: format!("decode output of discovery command {command}"),
            source: Box::new(e),
        })
    }

    /// Relative commands with a path component are taken relative to the
    /// project directory; bare names go through `PATH`.
    fn resolve_command(&self, project_dir: &Path) -> PathBuf {
        let command = Path::new(&self.settings.discovery.command);
        if command.is_relative() && command.components().count() > 1 {
            project_dir.join(command)
        } else {
            command.to_path_buf()
        }
    }
}
