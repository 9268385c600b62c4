//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/protomods/protomods.toml`
//! 3. Project config: `<project_dir>/protomods.toml`
//! 4. Environment variables: `PROTOMODS_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::infrastructure::render::{BUILD_TEMPLATE, NAMESPACE_TEMPLATE};

/// File name of the project-local config.
pub const PROJECT_CONFIG_FILE: &str = "protomods.toml";

/// External command that lists `<package> <path>` rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            command: "./utils/services.sh".into(),
            args: vec![],
        }
    }
}

/// Artifact locations, relative to the project directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Namespace declarations (module tree)
    pub namespace_file: PathBuf,
    /// Build descriptor
    pub build_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            namespace_file: PathBuf::from("src/lib.rs"),
            build_file: PathBuf::from("build.rs"),
        }
    }
}

/// Template names requested from the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateConfig {
    pub namespace: String,
    pub build: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE_TEMPLATE.into(),
            build: BUILD_TEMPLATE.into(),
        }
    }
}

/// Best-effort formatter run after the namespace artifact is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatterConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "cargo".into(),
            args: vec!["fmt".into()],
        }
    }
}

/// Options for the built-in templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodegenConfig {
    /// Macro invoked once per declared package
    pub include_macro: String,
    /// Generate gRPC server stubs
    pub build_server: bool,
    /// Include directories passed to the proto compiler
    pub include_dirs: Vec<String>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            include_macro: "tonic::include_proto".into(),
            build_server: false,
            include_dirs: vec!["proto".into()],
        }
    }
}

/// Raw sections for intermediate parsing (everything optional to detect
/// "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDiscoveryConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub namespace_file: Option<PathBuf>,
    pub build_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawTemplateConfig {
    pub namespace: Option<String>,
    pub build: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawFormatterConfig {
    pub enabled: Option<bool>,
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCodegenConfig {
    pub include_macro: Option<String>,
    pub build_server: Option<bool>,
    pub include_dirs: Option<Vec<String>>,
}

/// Raw settings for intermediate parsing.
///
/// `exclude` distinguishes:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub discovery: RawDiscoveryConfig,
    pub output: RawOutputConfig,
    pub templates: RawTemplateConfig,
    pub exclude: Option<Vec<String>>,
    pub formatter: RawFormatterConfig,
    pub codegen: RawCodegenConfig,
}

/// Unified configuration for protomods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Packages handled elsewhere, removed before the module tree is built
    pub exclude: Vec<String>,
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,
    pub templates: TemplateConfig,
    pub formatter: FormatterConfig,
    pub codegen: CodegenConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exclude: vec!["google.firebase.fcm.connection.v1alpha1".into()],
            discovery: DiscoveryConfig::default(),
            output: OutputConfig::default(),
            templates: TemplateConfig::default(),
            formatter: FormatterConfig::default(),
            codegen: CodegenConfig::default(),
        }
    }
}

/// Get the XDG config directory for protomods.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "protomods").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

/// Get the path to the config file of a project.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`, leaving the input untouched on failure.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are appended to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated, first occurrence wins
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let removed: HashSet<&str> = overlay
            .iter()
            .filter_map(|item| item.strip_prefix('!'))
            .collect();

        let mut seen = HashSet::new();
        base.iter()
            .chain(overlay.iter().filter(|item| !item.starts_with('!')))
            .filter(|item| !removed.contains(item.as_str()))
            .filter(|item| seen.insert(item.as_str()))
            .cloned()
            .collect()
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.discovery.command = expand_env_vars(&self.discovery.command);
        self.output.namespace_file =
            PathBuf::from(expand_env_vars(&self.output.namespace_file.to_string_lossy()));
        self.output.build_file =
            PathBuf::from(expand_env_vars(&self.output.build_file.to_string_lossy()));
        self.formatter.command = expand_env_vars(&self.formatter.command);
    }

    /// Overlay scalars (overlay wins if Some) and pick arrays with `array`.
    fn overlay(
        &self,
        raw: &RawSettings,
        array: impl Fn(&[String], &[String]) -> Vec<String>,
    ) -> Self {
        let pick = |base: &Vec<String>, over: &Option<Vec<String>>| {
            over.as_ref()
                .map(|o| array(base.as_slice(), o.as_slice()))
                .unwrap_or_else(|| base.clone())
        };

        Self {
            exclude: pick(&self.exclude, &raw.exclude),
            discovery: DiscoveryConfig {
                command: raw
                    .discovery
                    .command
                    .clone()
                    .unwrap_or_else(|| self.discovery.command.clone()),
                args: raw
                    .discovery
                    .args
                    .clone()
                    .unwrap_or_else(|| self.discovery.args.clone()),
            },
            output: OutputConfig {
                namespace_file: raw
                    .output
                    .namespace_file
                    .clone()
                    .unwrap_or_else(|| self.output.namespace_file.clone()),
                build_file: raw
                    .output
                    .build_file
                    .clone()
                    .unwrap_or_else(|| self.output.build_file.clone()),
            },
            templates: TemplateConfig {
                namespace: raw
                    .templates
                    .namespace
                    .clone()
                    .unwrap_or_else(|| self.templates.namespace.clone()),
                build: raw
                    .templates
                    .build
                    .clone()
                    .unwrap_or_else(|| self.templates.build.clone()),
            },
            formatter: FormatterConfig {
                enabled: raw.formatter.enabled.unwrap_or(self.formatter.enabled),
                command: raw
                    .formatter
                    .command
                    .clone()
                    .unwrap_or_else(|| self.formatter.command.clone()),
                args: raw
                    .formatter
                    .args
                    .clone()
                    .unwrap_or_else(|| self.formatter.args.clone()),
            },
            codegen: CodegenConfig {
                include_macro: raw
                    .codegen
                    .include_macro
                    .clone()
                    .unwrap_or_else(|| self.codegen.include_macro.clone()),
                build_server: raw.codegen.build_server.unwrap_or(self.codegen.build_server),
                include_dirs: raw
                    .codegen
                    .include_dirs
                    .clone()
                    .unwrap_or_else(|| self.codegen.include_dirs.clone()),
            },
        }
    }

    /// Merge project config onto self with union semantics for `exclude`.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        self.overlay(overlay, Self::merge_array)
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    ///
    /// Defaults are just examples; the global config defines the real baseline.
    fn apply_global(&self, global: &RawSettings) -> Self {
        self.overlay(global, |_, over| over.to_vec())
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory holding `protomods.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Project: UNION with negation support (`!pkg` removes)
    /// - Any → Env vars: REPLACE
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Load global config (REPLACES defaults)
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // 3. Load and merge project config (UNION with global)
        if let Some(project) = project_dir {
            let local_path = project_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Apply environment variables (replaces - explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply PROTOMODS_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("PROTOMODS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("exclude")
                .with_list_parse_key("discovery.args")
                .with_list_parse_key("formatter.args")
                .with_list_parse_key("codegen.include_dirs"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get::<Vec<String>>("exclude") {
            settings.exclude = val;
        }
        if let Ok(val) = config.get_string("discovery.command") {
            settings.discovery.command = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("discovery.args") {
            settings.discovery.args = val;
        }
        if let Ok(val) = config.get_string("output.namespace_file") {
            settings.output.namespace_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output.build_file") {
            settings.output.build_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("formatter.enabled") {
            settings.formatter.enabled = val;
        }
        if let Ok(val) = config.get_string("formatter.command") {
            settings.formatter.command = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("formatter.args") {
            settings.formatter.args = val;
        }
        if let Ok(val) = config.get_string("templates.namespace") {
            settings.templates.namespace = val;
        }
        if let Ok(val) = config.get_string("templates.build") {
            settings.templates.build = val;
        }
        if let Ok(val) = config.get_string("codegen.include_macro") {
            settings.codegen.include_macro = val;
        }
        if let Ok(val) = config.get_bool("codegen.build_server") {
            settings.codegen.build_server = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("codegen.include_dirs") {
            settings.codegen.include_dirs = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# protomods configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/protomods/protomods.toml  (defines your baseline)
#   Project: <project_dir>/protomods.toml        (project-specific additions)
#   Env:     PROTOMODS_* environment variables   (explicit overrides)
#            nested keys use "__", lists use ",":
#            PROTOMODS_EXCLUDE=a.b,c.d  PROTOMODS_CODEGEN__BUILD_SERVER=true
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Project config UNIONS `exclude` with global; "!pkg" removes an inherited entry:
#     exclude = ["google.other.v1", "!google.firebase.fcm.connection.v1alpha1"]

# Packages handled elsewhere; each must appear in the discovery output
# exclude = ["google.firebase.fcm.connection.v1alpha1"]

[discovery]
# Command printing "<package> <path>" rows sorted by package
# command = "./utils/services.sh"
# args = []

[output]
# namespace_file = "src/lib.rs"
# build_file = "build.rs"

[templates]
# Only the built-in templates "lib.rs" and "build.rs" exist
# namespace = "lib.rs"
# build = "build.rs"

[formatter]
# enabled = true
# command = "cargo"
# args = ["fmt"]

[codegen]
# include_macro = "tonic::include_proto"
# build_server = false
# include_dirs = ["proto"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn given_defaults_when_created_then_has_expected_values() {
        let settings = Settings::default();
        assert_eq!(settings.exclude, ["google.firebase.fcm.connection.v1alpha1"]);
        assert_eq!(settings.output.namespace_file, PathBuf::from("src/lib.rs"));
        assert_eq!(settings.output.build_file, PathBuf::from("build.rs"));
        assert_eq!(settings.templates.namespace, NAMESPACE_TEMPLATE);
        assert!(settings.formatter.enabled);
    }

    #[test]
    fn test_merge_array_union() {
        let merged = Settings::merge_array(&strings(&["a", "b"]), &strings(&["c"]));
        assert_eq!(merged, strings(&["a", "b", "c"]));
    }

    #[test]
    fn test_merge_array_negation() {
        let merged = Settings::merge_array(&strings(&["a", "b"]), &strings(&["!a", "c"]));
        assert_eq!(merged, strings(&["b", "c"]));
    }

    #[test]
    fn test_merge_array_negation_nonexistent() {
        let merged = Settings::merge_array(&strings(&["a"]), &strings(&["!z"]));
        assert_eq!(merged, strings(&["a"]));
    }

    #[test]
    fn test_merge_array_duplicates() {
        let merged = Settings::merge_array(&strings(&["a", "b"]), &strings(&["b", "a"]));
        assert_eq!(merged, strings(&["a", "b"]));
    }

    #[test]
    fn test_apply_global_replaces_arrays() {
        let raw: RawSettings = toml::from_str(
            r#"
exclude = ["x.y"]

[formatter]
enabled = false
"#,
        )
        .unwrap();
        let settings = Settings::default().apply_global(&raw);
        assert_eq!(settings.exclude, strings(&["x.y"]));
        assert!(!settings.formatter.enabled);
        assert_eq!(settings.formatter.command, "cargo");
    }

    #[test]
    fn test_merge_with_unions_exclude_and_overrides_scalars() {
        let raw: RawSettings = toml::from_str(
            r#"
exclude = ["x.y", "!google.firebase.fcm.connection.v1alpha1"]

[discovery]
command = "bin/discover"
"#,
        )
        .unwrap();
        let settings = Settings::default().merge_with(&raw);
        assert_eq!(settings.exclude, strings(&["x.y"]));
        assert_eq!(settings.discovery.command, "bin/discover");
        assert_eq!(settings.output, OutputConfig::default());
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips_through_toml() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let template = Settings::template();
        let raw: RawSettings = toml::from_str(&template).unwrap();
        assert!(raw.exclude.is_none());
        assert!(template.contains(NAMESPACE_TEMPLATE) && template.contains(BUILD_TEMPLATE));
        assert!(template.contains("PROTOMODS_EXCLUDE="));
    }
}
