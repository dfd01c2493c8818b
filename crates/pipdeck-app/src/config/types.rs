//! Configuration types for pipdeck
//!
//! Defines:
//! - `Settings` - Global application settings
//! - `PipSettings`, `StreamingSettings`, `WheelIndexSettings` - its sections

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pipdeck_core::prelude::*;
use pipdeck_daemon::{PipInvocation, ReadStrategy, StreamOptions, DEFAULT_PIP};

/// Global settings from `.pipdeck/config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub pip: PipSettings,

    #[serde(default)]
    pub streaming: StreamingSettings,

    #[serde(default)]
    pub wheel_index: WheelIndexSettings,
}

impl Settings {
    /// Reject values that would make the app unusable
    pub fn validate(&self) -> Result<()> {
        if self.pip.executable.trim().is_empty() {
            return Err(Error::config_invalid("pip.executable is empty"));
        }
        if self.pip.capture_timeout_secs == 0 {
            return Err(Error::config_invalid(
                "pip.capture_timeout_secs must be greater than 0",
            ));
        }
        if self.streaming.poll_interval_ms == 0 {
            return Err(Error::config_invalid(
                "streaming.poll_interval_ms must be greater than 0",
            ));
        }
        if self.streaming.max_log_lines == 0 {
            return Err(Error::config_invalid(
                "streaming.max_log_lines must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// How pip is launched
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipSettings {
    /// pip executable name or path
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Prefix for install/uninstall, e.g. `["gksudo", "--"]`
    #[serde(default)]
    pub elevate: Vec<String>,

    /// Timeout for captured commands (search, list, show)
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,
}

impl Default for PipSettings {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            elevate: Vec::new(),
            capture_timeout_secs: default_capture_timeout_secs(),
        }
    }
}

impl PipSettings {
    pub fn invocation(&self) -> PipInvocation {
        PipInvocation {
            executable: self.executable.clone(),
            elevate: self.elevate.clone(),
        }
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }
}

fn default_executable() -> String {
    DEFAULT_PIP.to_string()
}

fn default_capture_timeout_secs() -> u64 {
    120
}

/// Output streaming settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingSettings {
    /// How often the consumer drains the queue
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub read_strategy: ReadStrategy,

    /// Upper bound on draining output after the child exits
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Lines kept in the task log; older lines are dropped
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            read_strategy: ReadStrategy::default(),
            drain_timeout_ms: default_drain_timeout_ms(),
            max_log_lines: default_max_log_lines(),
        }
    }
}

impl StreamingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::default()
            .with_strategy(self.read_strategy)
            .with_drain_timeout(Duration::from_millis(self.drain_timeout_ms))
    }
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_drain_timeout_ms() -> u64 {
    2000
}

fn default_max_log_lines() -> usize {
    10_000
}

/// Third-party wheel index
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WheelIndexSettings {
    /// Index JSON, relative paths resolve against the project directory
    #[serde(default = "default_wheel_index_path")]
    pub path: PathBuf,

    /// Python compatibility tag to filter wheels by, e.g. `cp311`
    #[serde(default = "default_python_tag")]
    pub python_tag: String,
}

impl Default for WheelIndexSettings {
    fn default() -> Self {
        Self {
            path: default_wheel_index_path(),
            python_tag: default_python_tag(),
        }
    }
}

impl WheelIndexSettings {
    pub fn resolve_path(&self, project_path: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            project_path.join(&self.path)
        }
    }
}

fn default_wheel_index_path() -> PathBuf {
    PathBuf::from("pythonlibs.json")
}

fn default_python_tag() -> String {
    "cp311".to_string()
}
