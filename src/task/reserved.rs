// src/task/reserved.rs

//! Reserved task namespace.
//!
//! Names under [`RESERVED_PREFIX`] configure the engine instead of doing
//! work. The only one currently understood is [`PRE_PHASE_TASK`], whose
//! dependency list declares the pre-phase membership.

use tracing::debug;

use crate::errors::ConfigError;
use crate::task::TaskSet;

pub const RESERVED_PREFIX: &str = "gatedag:";
pub const PRE_PHASE_TASK: &str = "gatedag:pre-phase";

/// Known reserved task names.
const KNOWN_RESERVED: &[&str] = &[PRE_PHASE_TASK];

pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Check the reserved-namespace rules over the whole task set:
///
/// - every reserved name must be a known one,
/// - reserved tasks carry no work,
/// - no task depends on a reserved task.
pub fn check_reserved_namespace(tasks: &TaskSet) -> Result<(), ConfigError> {
    for def in tasks.iter() {
        if is_reserved(&def.name) {
            if !KNOWN_RESERVED.contains(&def.name.as_str()) {
                return Err(ConfigError::UnknownReservedTask(def.name.clone()));
            }
            if def.has_work() {
                return Err(ConfigError::ReservedTaskHasWork(def.name.clone()));
            }
        }

        if let Some(dep) = def.dependencies.iter().find(|d| is_reserved(d)) {
            return Err(ConfigError::DependsOnReservedTask {
                task: def.name.clone(),
                dependency: dep.clone(),
            });
        }
    }

    debug!(tasks = tasks.len(), "reserved namespace checks passed");
    Ok(())
}
