// src/config/validate.rs

use std::path::{Component, Path};

use crate::config::model::{RawSupervisorConfig, SupervisorConfig};
use crate::errors::{DevloopError, Result};

impl TryFrom<RawSupervisorConfig> for SupervisorConfig {
    type Error = DevloopError;

    fn try_from(raw: RawSupervisorConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(SupervisorConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawSupervisorConfig) -> Result<()> {
    validate_root(&cfg.root)?;
    validate_component("binary_name", &cfg.binary_name)?;
    validate_component("ignored_dir", &cfg.ignored_dir)?;
    validate_debounce(cfg)?;

    if cfg.build_program.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "build_program must not be empty".to_string(),
        ));
    }

    if cfg.stop_timeout.is_some_and(|t| t.is_zero()) {
        return Err(DevloopError::ConfigError(
            "stop_timeout must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_root(root: &Path) -> Result<()> {
    if !root.is_absolute() {
        return Err(DevloopError::ConfigError(format!(
            "project root must be an absolute path (got {:?})",
            root
        )));
    }
    if !root.is_dir() {
        return Err(DevloopError::ConfigError(format!(
            "project root {:?} is not a directory",
            root
        )));
    }
    Ok(())
}

/// `value` must be exactly one normal path component (no separators, no
/// `.`/`..`).
fn validate_component(field: &str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(DevloopError::ConfigError(format!(
            "{field} must be a single file name (got {value:?})"
        ))),
    }
}

fn validate_debounce(cfg: &RawSupervisorConfig) -> Result<()> {
    if cfg.restart_debounce.is_zero() {
        return Err(DevloopError::ConfigError(
            "restart_debounce must be > 0".to_string(),
        ));
    }
    if cfg.build_debounce.is_zero() {
        return Err(DevloopError::ConfigError(
            "build_debounce must be > 0".to_string(),
        ));
    }
    if cfg.restart_debounce > cfg.build_debounce {
        return Err(DevloopError::ConfigError(format!(
            "restart_debounce ({:?}) must not exceed build_debounce ({:?})",
            cfg.restart_debounce, cfg.build_debounce
        )));
    }
    Ok(())
}
