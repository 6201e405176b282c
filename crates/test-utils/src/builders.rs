#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use devloop::config::{RawSupervisorConfig, SupervisorConfig};

/// Builder for `SupervisorConfig` to simplify test setup.
///
/// Starts from the production constants; tests usually shrink the debounce
/// windows so they finish quickly on real time.
pub struct ConfigBuilder {
    config: RawSupervisorConfig,
}

impl ConfigBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            config: RawSupervisorConfig::with_defaults(root.as_ref()),
        }
    }

    pub fn binary_name(mut self, name: &str) -> Self {
        self.config.binary_name = name.to_string();
        self
    }

    pub fn ignored_dir(mut self, name: &str) -> Self {
        self.config.ignored_dir = name.to_string();
        self
    }

    pub fn restart_debounce(mut self, window: Duration) -> Self {
        self.config.restart_debounce = window;
        self
    }

    pub fn build_debounce(mut self, window: Duration) -> Self {
        self.config.build_debounce = window;
        self
    }

    pub fn build_program(mut self, program: &str) -> Self {
        self.config.build_program = program.to_string();
        self
    }

    pub fn stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.stop_timeout = timeout;
        self
    }

    pub fn build_raw(self) -> RawSupervisorConfig {
        self.config
    }

    pub fn build(self) -> SupervisorConfig {
        SupervisorConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
