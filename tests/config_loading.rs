// tests/config_loading.rs

use std::io::Write;
use std::path::Path;

use clap::Parser;
use gatedag::cli::CliArgs;
use gatedag::config::{EngineSection, default_config_path, load_and_validate, load_from_path};
use gatedag::errors::{ConfigError, GatedagError};
use gatedag::task::TaskSet;
use gatedag::{engine_options, requested_roots};
use gatedag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_full_config_is_loaded() {
    let file = write_config(
        r#"
[config]
threads = 4
keep_going = true
default = "build"

[task."gatedag:pre-phase"]
after = ["clean"]

[task.clean]
cmd = "rm -rf out"

[task.build]
cmd = "make"
after = ["clean"]
description = "compile everything"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config.threads, 4);
    assert!(cfg.config.keep_going);
    assert_eq!(cfg.config.default.as_deref(), Some("build"));
    assert_eq!(cfg.task.len(), 3);
    assert_eq!(cfg.task["build"].after, vec!["clean"]);
    assert!(cfg.task["gatedag:pre-phase"].cmd.is_none());
}

#[test]
fn test_engine_section_defaults() {
    let file = write_config(
        r#"
[task.A]
cmd = "echo A"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config.threads, EngineSection::default().threads);
    assert_eq!(cfg.config.threads, 2);
    assert!(!cfg.config.keep_going);
    assert!(cfg.config.default.is_none());
}

#[test]
fn test_task_set_from_config_wraps_commands() {
    let cfg = ConfigFileBuilder::new()
        .with_task("lint", TaskConfigBuilder::new("cargo clippy").build())
        .with_task(
            "ci",
            TaskConfigBuilder::group()
                .after("lint")
                .description("everything")
                .build(),
        )
        .build();

    let tasks = TaskSet::from_config(&cfg);

    let lint = tasks.get("lint").unwrap();
    assert_eq!(lint.work.as_ref().map(|w| w.describe()).as_deref(), Some("cargo clippy"));
    let ci = tasks.get("ci").unwrap();
    assert!(!ci.has_work());
    assert_eq!(ci.dependencies, vec!["lint"]);
    assert_eq!(ci.description.as_deref(), Some("everything"));
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let file = write_config(
        r#"
[task.A]
cmd = "echo A"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(GatedagError::Config(ConfigError::DependencyCycle(task))) => assert_eq!(task, "A"),
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = write_config(
        r#"
[task.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();

    assert_eq!(
        err.as_config(),
        Some(&ConfigError::UnknownDependency {
            task: "A".to_string(),
            dependency: "NonExistent".to_string(),
        })
    );
    assert!(err.to_string().contains("unknown dependency 'NonExistent'"));
}

#[test]
fn test_invalid_engine_section_is_rejected() {
    let zero_threads = write_config(
        r#"
[config]
threads = 0

[task.A]
cmd = "echo A"
"#,
    );
    let unknown_default = write_config(
        r#"
[config]
default = "ghost"

[task.A]
cmd = "echo A"
"#,
    );
    let reserved_default = write_config(
        r#"
[config]
default = "gatedag:pre-phase"

[task."gatedag:pre-phase"]
after = ["A"]

[task.A]
cmd = "echo A"
"#,
    );

    assert!(matches!(
        load_and_validate(zero_threads.path()).unwrap_err().as_config(),
        Some(ConfigError::Invalid(_))
    ));
    assert_eq!(
        load_and_validate(unknown_default.path()).unwrap_err().as_config(),
        Some(&ConfigError::UnknownTask("ghost".to_string()))
    );
    assert_eq!(
        load_and_validate(reserved_default.path()).unwrap_err().as_config(),
        Some(&ConfigError::CannotExecuteReservedTask(
            "gatedag:pre-phase".to_string()
        ))
    );
}

#[test]
fn test_config_without_tasks_is_rejected() {
    let file = write_config("[config]\nthreads = 2\n");

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err.as_config(), Some(ConfigError::Invalid(_))));
}

#[test]
fn test_malformed_toml_is_a_toml_error() {
    let file = write_config("[task.A\ncmd = ");

    assert!(matches!(
        load_from_path(file.path()),
        Err(GatedagError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        load_and_validate(dir.path().join("Gatedag.toml")),
        Err(GatedagError::IoError(_))
    ));
}

#[test]
fn test_cli_overrides_config() {
    let cfg = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").build())
        .with_threads(3)
        .with_default("A")
        .build();

    let args = CliArgs::parse_from(["gatedag", "-j", "8", "-k", "A", "A"]);
    let options = engine_options(&cfg, &args);
    assert_eq!(options.threads, 8);
    assert!(options.keep_going);
    assert_eq!(requested_roots(&cfg, &args).unwrap(), vec!["A", "A"]);

    let args = CliArgs::parse_from(["gatedag"]);
    let options = engine_options(&cfg, &args);
    assert_eq!(options.threads, 3);
    assert!(!options.keep_going);
    assert_eq!(requested_roots(&cfg, &args).unwrap(), vec!["A"]);
}

#[test]
fn test_config_flag_defaults_to_gatedag_toml() {
    let args = CliArgs::parse_from(["gatedag"]);
    assert_eq!(args.config, default_config_path());
    assert_eq!(args.config, Path::new("Gatedag.toml"));

    let args = CliArgs::parse_from(["gatedag", "--config", "ci/tasks.toml"]);
    assert_eq!(args.config, Path::new("ci/tasks.toml"));
}

#[test]
fn test_no_task_and_no_default_is_a_config_error() {
    let cfg = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").build())
        .build();
    let args = CliArgs::parse_from(["gatedag", "--quiet"]);

    assert!(matches!(
        requested_roots(&cfg, &args),
        Err(ConfigError::Invalid(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_commands_run_and_report_exit_status() {
    use gatedag::engine::{Engine, EngineOptions};

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("built");
    let file = write_config(&format!(
        r#"
[task.prepare]
cmd = "echo preparing"

[task.build]
cmd = "touch '{}'"
after = ["prepare"]

[task.broken]
cmd = "exit 3"
"#,
        marker.display()
    ));
    let cfg = load_and_validate(file.path()).unwrap();
    let engine = Engine::new(TaskSet::from_config(&cfg), EngineOptions::default());

    gatedag_test_utils::with_timeout(engine.execute(&["build"]))
        .await
        .unwrap();
    assert!(marker.exists());

    let err = gatedag_test_utils::with_timeout(engine.execute(&["broken"]))
        .await
        .unwrap_err();
    assert_eq!(err.failed_task(), Some("broken"));
    assert!(err.to_string().contains("exited with status 3"), "{err}");
}

#[cfg(unix)]
#[tokio::test]
async fn test_chatty_command_output_is_drained_before_status() {
    use gatedag::engine::{Engine, EngineOptions};

    // Well past a pipe buffer on both streams.
    let file = write_config(
        r#"
[task.chatty]
cmd = "head -c 300000 /dev/zero | tr '\\0' 'o'; head -c 300000 /dev/zero | tr '\\0' 'e' >&2; echo done"
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();
    let engine = Engine::new(TaskSet::from_config(&cfg), EngineOptions::default());

    gatedag_test_utils::with_timeout(engine.execute(&["chatty"]))
        .await
        .unwrap();
}
