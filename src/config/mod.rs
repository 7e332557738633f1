// src/config/mod.rs

//! Configuration loading and validation for gatedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate file-level invariants such as known `after` references
//!   (`validate.rs`). Reserved-namespace and phase rules are checked by the
//!   engine right before scheduling, since they apply to programmatic task
//!   sets too.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, EngineSection, RawConfigFile, TaskConfig};
