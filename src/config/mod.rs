// src/config/mod.rs

//! Supervisor configuration.
//!
//! There is no config file: every value is a fixed constant except the
//! project root, which is the working directory at startup.
//!
//! - [`model`] defines the raw constants and the validated structure.
//! - [`loader`] builds the raw config for the current directory.
//! - [`validate`] checks the invariants and produces a [`SupervisorConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{from_current_dir, from_root};
pub use model::{RawSupervisorConfig, SupervisorConfig};
