// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ConfigError, GatedagError};
use crate::task::is_reserved;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GatedagError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    ensure_has_tasks(cfg)?;
    validate_engine_section(cfg)?;
    validate_task_dependencies(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.task.is_empty() {
        return Err(ConfigError::Invalid(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine_section(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.config.threads == 0 {
        return Err(ConfigError::Invalid(
            "[config].threads must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(default) = &cfg.config.default {
        if is_reserved(default) {
            return Err(ConfigError::CannotExecuteReservedTask(default.clone()));
        }
        if !cfg.task.contains_key(default) {
            return Err(ConfigError::UnknownTask(default.clone()));
        }
    }

    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(ConfigError::DependencyCycle(name.clone()));
            }
            if !cfg.task.contains_key(dep) {
                return Err(ConfigError::UnknownDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}
