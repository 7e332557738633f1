// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `gatedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gatedag",
    version,
    about = "Run interdependent tasks in parallel, pre-phase first.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Gatedag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Worker pool size. Overrides `[config].threads`.
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Keep running the remaining tasks after one fails.
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GATEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print each task's dependency graph without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Don't print `+ task` / `- task` progress lines.
    #[arg(short, long)]
    pub quiet: bool,

    /// Tasks to run, in order. Defaults to `[config].default`.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
