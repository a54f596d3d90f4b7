//! Runtime Configuration
//!
//! Handles parsing and management of sigdefer.toml configuration files.

use crate::blocking::DEFAULT_TICK;
use crate::signal::SignalNumbering;
use libc::c_int;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name searched for by [`RuntimeConfig::find_and_load`].
pub const CONFIG_FILE: &str = "sigdefer.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Unknown signal in config: {0}")]
    UnknownSignal(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching sigdefer.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    /// Signal handling
    #[serde(default)]
    pub signals: SignalsConfig,

    /// Blocking-section strategy
    #[serde(default)]
    pub blocking: BlockingConfig,
}

impl RuntimeConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Signal handling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalsConfig {
    /// Bind the host handler when actions are registered
    #[serde(default = "default_true")]
    pub install_handlers: bool,

    /// Signals that may never be intercepted, by name
    #[serde(default = "default_reserved")]
    pub reserved: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Synchronous fault signals re-fault if their handler merely defers.
fn default_reserved() -> Vec<String> {
    ["SIGSEGV", "SIGBUS", "SIGFPE", "SIGILL"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            install_handlers: true,
            reserved: default_reserved(),
        }
    }
}

impl SignalsConfig {
    /// Host numbers of the reserved signals, always including the two the
    /// host never lets a process catch.
    pub fn reserved_hosts(&self, numbering: &SignalNumbering) -> ConfigResult<Vec<c_int>> {
        let mut hosts = vec![libc::SIGKILL, libc::SIGSTOP];
        for name in &self.reserved {
            let signal = numbering.parse(name).map_err(|_| {
                log::warn!("unknown reserved signal in config: {}", name);
                ConfigError::UnknownSignal(name.clone())
            })?;
            let host = numbering
                .to_host(signal)
                .map_err(|_| ConfigError::UnknownSignal(name.clone()))?;
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        Ok(hosts)
    }
}

/// How execution contexts share the runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BlockingMode {
    /// One context; blocking sections are no-ops
    #[default]
    SingleThreaded,
    /// Contexts contend for a master lock
    MasterLock,
}

/// Blocking-section settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockingConfig {
    #[serde(default)]
    pub mode: BlockingMode,

    /// Yield interval for master-lock mode, 0 disables
    #[serde(default = "default_tick_ms")]
    pub tick_interval_ms: u64,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            mode: BlockingMode::default(),
            tick_interval_ms: default_tick_ms(),
        }
    }
}

impl BlockingConfig {
    /// Ticker interval, if one should run.
    pub fn tick_interval(&self) -> Option<Duration> {
        match (self.mode, self.tick_interval_ms) {
            (BlockingMode::MasterLock, ms) if ms > 0 => Some(Duration::from_millis(ms)),
            _ => None,
        }
    }
}
