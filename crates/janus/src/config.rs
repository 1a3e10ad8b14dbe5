//! Configuration: compile flags handed to the parser and monitor tuning.
//!
//! Both sections are plain serde structs so they can live in a YAML file:
//!
//! ```yaml
//! flags:
//!   includePaths: [include, third_party]
//!   defines: [DEBUG, MAX_SIZE=100]
//!   standard: c++17
//!   extraArgs: [-Wall]
//! monitor:
//!   debounceMs: 250
//!   pollIntervalMs: 1000
//!   workers: 2
//!   osEvents: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default quiet period before a changed file is re-parsed.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Default interval between fingerprint polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default number of parse workers used by the monitor.
pub const DEFAULT_WORKERS: usize = 2;

/// Compiler flags for one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileFlags {
    /// Header search directories (`-I`)
    pub include_paths: Vec<PathBuf>,
    /// Macro definitions, `NAME` or `NAME=VALUE` (`-D`)
    pub defines: Vec<String>,
    /// Language dialect, e.g. `c++17` (`-std=`)
    pub standard: Option<String>,
    /// Flags passed through verbatim
    pub extra_args: Vec<String>,
}

impl CompileFlags {
    /// Render as a clang-style argument list, in a stable order.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(
            self.include_paths.len() + self.defines.len() + self.extra_args.len() + 1,
        );
        args.extend(
            self.include_paths
                .iter()
                .map(|p| format!("-I{}", p.display())),
        );
        args.extend(self.defines.iter().map(|d| format!("-D{d}")));
        if let Some(std) = &self.standard {
            args.push(format!("-std={std}"));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Merge `other` into `self`: lists are appended, a set standard overrides.
    pub fn merge(&mut self, other: CompileFlags) {
        self.include_paths.extend(other.include_paths);
        self.defines.extend(other.defines);
        if other.standard.is_some() {
            self.standard = other.standard;
        }
        self.extra_args.extend(other.extra_args);
    }
}

/// Tuning for the monitoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Quiet period after a change before re-parsing; `0` re-parses immediately
    pub debounce_ms: u64,
    /// Fingerprint polling interval; `0` disables polling
    pub poll_interval_ms: u64,
    /// Parse worker threads
    pub workers: usize,
    /// Subscribe to OS file-change events
    pub os_events: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            workers: DEFAULT_WORKERS,
            os_events: true,
        }
    }
}

impl MonitorConfig {
    /// Debounce window.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Polling interval, or `None` when polling is disabled.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("monitor.workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanusConfig {
    /// Compile flags applied to every load
    pub flags: CompileFlags,
    /// Monitor settings
    pub monitor: MonitorConfig,
}

impl JanusConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if it
    /// is not valid YAML for this structure.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.monitor.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on serialization failure and `Error::Io` on write failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
