//! End-to-end tests for GenerateService against temporary projects.
//!
//! Discovery is simulated with `sh -c "printf ..."` or a script under
//! `utils/`; the formatter with `true`/`false`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::TempDir;

use protomods::application::services::{FormatOutcome, GenerateOptions};
use protomods::application::ApplicationError;
use protomods::config::Settings;
use protomods::domain::DomainError;
use protomods::infrastructure::di::ServiceContainer;
use protomods::util::testing;

const ROWS: &str = "\
google.rpc proto/google/rpc/status.proto
google.rpc.context proto/google/rpc/context/attribute_context.proto
grafana.v1 proto/grafana/v1/dashboard.proto
grafana.v1 proto/grafana/v1/folder.proto
noise.v1 proto/noise/v1/noise.proto
";

/// Settings with discovery printing `rows` and a no-op formatter.
fn settings_with_rows(rows: &str) -> Settings {
    let mut settings = Settings::default();
    settings.exclude = vec!["noise.v1".to_string()];
    settings.discovery.command = "sh".to_string();
    settings.discovery.args = vec!["-c".to_string(), format!("printf '%s' '{rows}'")];
    settings.formatter.command = "true".to_string();
    settings.formatter.args = vec![];
    settings
}

fn generate(
    project: &Path,
    settings: Settings,
    options: GenerateOptions,
) -> Result<protomods::application::services::GenerateReport, ApplicationError> {
    ServiceContainer::new(settings)
        .generate_service()
        .generate(project, options)
}

#[test]
fn given_discovered_packages_when_generating_then_writes_both_artifacts() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();

    let report = generate(
        temp.path(),
        settings_with_rows(ROWS),
        GenerateOptions::default(),
    )
    .unwrap();

    assert_eq!(report.rows, 5);
    assert_eq!(report.excluded, 1);
    assert_eq!(report.format, FormatOutcome::Formatted);

    let lib = fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    let expected = "\
// This file is @generated by protomods. Do not edit.

pub mod google {
    pub mod rpc {
        pub mod context {
            tonic::include_proto!(\"google.rpc.context\");
        }
        tonic::include_proto!(\"google.rpc\");
    }
}

pub mod grafana {
    pub mod v1 {
        tonic::include_proto!(\"grafana.v1\");
    }
}
";
    assert_eq!(lib, expected);

    let build = fs::read_to_string(temp.path().join("build.rs")).unwrap();
    // Every row's path survives, including excluded and duplicated packages
    for path in [
        "proto/google/rpc/status.proto",
        "proto/grafana/v1/dashboard.proto",
        "proto/grafana/v1/folder.proto",
        "proto/noise/v1/noise.proto",
    ] {
        assert!(build.contains(&format!("\"{path}\",")), "missing {path}");
    }
    assert!(build.find("dashboard").unwrap() < build.find("folder").unwrap());
}

#[test]
fn given_unchanged_discovery_when_generating_twice_then_output_is_identical() {
    let temp = TempDir::new().unwrap();

    generate(temp.path(), settings_with_rows(ROWS), GenerateOptions::default()).unwrap();
    let first_lib = fs::read(temp.path().join("src/lib.rs")).unwrap();
    let first_build = fs::read(temp.path().join("build.rs")).unwrap();

    generate(temp.path(), settings_with_rows(ROWS), GenerateOptions::default()).unwrap();

    assert_eq!(fs::read(temp.path().join("src/lib.rs")).unwrap(), first_lib);
    assert_eq!(fs::read(temp.path().join("build.rs")).unwrap(), first_build);
}

#[test]
fn given_dry_run_when_generating_then_nothing_is_written() {
    let temp = TempDir::new().unwrap();

    let report = generate(
        temp.path(),
        settings_with_rows(ROWS),
        GenerateOptions {
            dry_run: true,
            format: true,
        },
    )
    .unwrap();

    assert!(report.written.is_empty());
    assert_eq!(report.format, FormatOutcome::Skipped);
    assert!(report.artifacts.namespace.content.contains("pub mod google"));
    assert!(!temp.path().join("src").exists());
    assert!(!temp.path().join("build.rs").exists());
}

#[test]
fn given_missing_denylist_entry_when_generating_then_aborts_before_writing() {
    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_rows(ROWS);
    settings.exclude = vec!["google.firebase.fcm.connection.v1alpha1".to_string()];

    let err = generate(temp.path(), settings, GenerateOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ExcludedPackageMissing(_))
    ));
    assert!(!temp.path().join("src/lib.rs").exists());
    assert!(!temp.path().join("build.rs").exists());
}

#[test]
fn given_existing_artifacts_when_discovery_fails_then_they_are_untouched() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/lib.rs"), "// previous\n").unwrap();

    let mut settings = settings_with_rows(ROWS);
    settings.discovery.args = vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()];

    let err = generate(temp.path(), settings, GenerateOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Discovery {
            exit_code: Some(3),
            ..
        }
    ));
    assert!(err.to_string().contains("broken"), "unexpected error: {err}");
    assert_eq!(
        fs::read_to_string(temp.path().join("src/lib.rs")).unwrap(),
        "// previous\n"
    );
}

#[test]
fn given_malformed_row_when_generating_then_fails_with_data_error() {
    let temp = TempDir::new().unwrap();
    let settings = settings_with_rows("noise.v1 proto/noise.proto\nbroken\n");

    let err = generate(temp.path(), settings, GenerateOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MalformedRow { line: 2, .. })
    ));
}

#[test]
fn given_failing_formatter_when_generating_then_artifacts_are_kept() {
    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_rows(ROWS);
    settings.formatter.command = "false".to_string();

    let report = generate(temp.path(), settings, GenerateOptions::default()).unwrap();

    assert!(matches!(report.format, FormatOutcome::Failed(_)));
    assert!(temp.path().join("src/lib.rs").exists());
    assert!(temp.path().join("build.rs").exists());
}

#[test]
fn given_formatter_disabled_when_generating_then_skipped() {
    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_rows(ROWS);
    settings.formatter.enabled = false;

    let report = generate(temp.path(), settings, GenerateOptions::default()).unwrap();

    assert_eq!(report.format, FormatOutcome::Skipped);
}

#[test]
fn given_nested_output_location_when_generating_then_creates_directories() {
    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_rows(ROWS);
    settings.output.namespace_file = "gen/rust/src/lib.rs".into();

    generate(temp.path(), settings, GenerateOptions::default()).unwrap();

    assert!(temp.path().join("gen/rust/src/lib.rs").is_file());
}

#[test]
fn given_unknown_template_when_generating_then_render_error() {
    let temp = TempDir::new().unwrap();
    let mut settings = settings_with_rows(ROWS);
    settings.templates.namespace = "mod.rs".to_string();

    let err = generate(temp.path(), settings, GenerateOptions::default()).unwrap_err();

    assert!(matches!(err, ApplicationError::Render { ref template, .. } if template == "mod.rs"));
    assert!(!temp.path().join("build.rs").exists());
}

#[test]
fn given_default_discovery_script_when_generating_then_runs_relative_to_project() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("utils/services.sh");
    fs::create_dir_all(script.parent().unwrap()).unwrap();
    fs::write(
        &script,
        "#!/bin/sh\necho 'acme.billing.v1 proto/acme/billing/v1/billing.proto'\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let mut settings = Settings::default();
    settings.exclude = vec![];
    settings.formatter.enabled = false;

    generate(temp.path(), settings, GenerateOptions::default()).unwrap();

    let lib = fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    assert!(lib.contains("tonic::include_proto!(\"acme.billing.v1\");"));
}
