// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pool;
pub mod task;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Engine, EngineOptions, ProgressPrinter};
use crate::errors::ConfigError;
use crate::task::TaskSet;
use crate::types::TaskName;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - task set construction
/// - the engine, with a progress printer unless `--quiet`
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    let options = engine_options(&cfg, &args);
    let roots = requested_roots(&cfg, &args)?;
    let tasks = TaskSet::from_config(&cfg);

    let mut engine = Engine::new(tasks, options);

    if args.dry_run {
        print_dry_run(&engine, &roots)?;
        return Ok(());
    }

    if !args.quiet {
        engine = engine.with_observer(Arc::new(ProgressPrinter::stdout()));
    }

    info!(?roots, threads = options.threads, keep_going = options.keep_going, "starting");
    engine.execute(roots.as_slice()).await?;
    Ok(())
}

/// `[config]` values, overridden by whatever was given on the command line.
pub fn engine_options(cfg: &ConfigFile, args: &CliArgs) -> EngineOptions {
    let mut options = EngineOptions::from_config(&cfg.config);
    if let Some(threads) = args.threads {
        options.threads = threads;
    }
    if args.keep_going {
        options.keep_going = true;
    }
    options
}

/// Tasks named on the command line, or else the config's `default`.
pub fn requested_roots(cfg: &ConfigFile, args: &CliArgs) -> Result<Vec<TaskName>, ConfigError> {
    if !args.tasks.is_empty() {
        return Ok(args.tasks.clone());
    }

    match &cfg.config.default {
        Some(default) => Ok(vec![default.clone()]),
        None => Err(ConfigError::Invalid(
            "no task given and [config].default is not set".to_string(),
        )),
    }
}

/// Validate every root and print its graph without executing anything.
fn print_dry_run(engine: &Engine, roots: &[TaskName]) -> Result<()> {
    println!("gatedag dry-run");
    println!("  threads = {}", engine.options().threads);
    println!("  keep_going = {}", engine.options().keep_going);

    for root in roots {
        let graph = engine.plan(root)?;
        println!();
        println!("{root} ({} tasks):", graph.len());
        print!("{}", graph.dump());
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
