// src/config/loader.rs

use std::path::Path;

use crate::config::model::{RawSupervisorConfig, SupervisorConfig};
use crate::errors::Result;

/// Build and validate the configuration for the current working directory.
///
/// This is the entry point used by [`crate::run`]; the working directory at
/// startup becomes the immutable project root.
pub fn from_current_dir() -> Result<SupervisorConfig> {
    let root = std::env::current_dir()?;
    from_root(root)
}

/// Build and validate the configuration for an explicit root.
pub fn from_root(root: impl AsRef<Path>) -> Result<SupervisorConfig> {
    let raw = RawSupervisorConfig::with_defaults(root.as_ref());
    SupervisorConfig::try_from(raw)
}
