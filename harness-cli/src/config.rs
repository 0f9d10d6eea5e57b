//! Configuration loading for the cloudtest CLI.
//!
//! Configuration is loaded from a TOML file (default: `harness.toml`):
//!
//! ```toml
//! [topology]
//! network = "managed"
//!
//! [[topology.nodes]]
//! hostname = "clc.example.com"
//! distro = "centos"
//! distro_version = "5.7"
//! arch = "64"
//! source = "repo"
//! roles = ["clc", "ws", "cc00", "sc00"]
//!
//! [credentials]
//! username = "root"
//! key_path = "/home/qa/.ssh/id_rsa"
//!
//! [logs]
//! poll_interval_ms = 1000
//! prefix = "cloudtest-"
//!
//! [ssh]
//! connect_timeout_secs = 30
//! ```

use harness_client::{AggregatorConfig, SshOptions};
use harness_types::{Credentials, Role, Topology};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Declared cluster topology.
    pub topology: Topology,
    /// Login material for every host.
    #[serde(default)]
    pub credentials: Credentials,
    /// Log aggregation settings.
    #[serde(default)]
    pub logs: LogsConfig,
    /// SSH client settings.
    #[serde(default)]
    pub ssh: SshConfig,
}

/// Log aggregation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Wait between poll iterations in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-session read wait in milliseconds (default: 0, never blocks).
    #[serde(default)]
    pub read_timeout_ms: u64,
    /// Output file prefix for saved logs (default: `cloudtest-`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Per-role remote log path overrides.
    #[serde(default)]
    pub paths: HashMap<Role, String>,
}

/// SSH client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    /// SSH binary (default: `ssh`).
    #[serde(default = "default_ssh_program")]
    pub program: String,
    /// Connect timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Verify host keys (default: false).
    #[serde(default)]
    pub strict_host_key_checking: bool,
    /// Remote port override.
    pub port: Option<u16>,
    /// Maximum bytes read per poll (default: 64 KiB).
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

// Default value functions
fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_prefix() -> String {
    "cloudtest-".to_string()
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_read_chunk_bytes() -> usize {
    64 * 1024
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            read_timeout_ms: 0,
            prefix: default_prefix(),
            paths: HashMap::new(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: default_ssh_program(),
            connect_timeout_secs: default_connect_timeout_secs(),
            strict_host_key_checking: false,
            port: None,
            read_chunk_bytes: default_read_chunk_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it holds
    /// an unusable value (see [`Config::validate`]).
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigFileError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate().map_err(|reason| ConfigFileError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), String> {
        if self.logs.poll_interval_ms == 0 {
            return Err("logs.poll_interval_ms must be at least 1".to_string());
        }
        Ok(())
    }

    /// Options for the ssh session provider.
    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            program: self.ssh.program.clone(),
            connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
            strict_host_key_checking: self.ssh.strict_host_key_checking,
            port: self.ssh.port,
            read_chunk: self.ssh.read_chunk_bytes,
        }
    }

    /// Settings for the log aggregator.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            poll_interval: Duration::from_millis(self.logs.poll_interval_ms),
            read_timeout: Duration::from_millis(self.logs.read_timeout_ms),
            credentials: self.credentials.clone(),
            log_paths: self.logs.paths.clone(),
        }
    }
}

/// Configuration file error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but holds an unusable value.
    #[error("invalid config file {path}: {reason}")]
    Invalid {
        /// Path to the configuration file.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },
}
