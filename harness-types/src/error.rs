//! Error types for the cloudtest harness.

use thiserror::Error;

use crate::role::Role;

/// Topology and role resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A role tag that is not part of the known role set.
    #[error("unknown role tag: {0:?}")]
    UnknownRole(String),

    /// No node in the topology declares the requested role.
    #[error("no node declares role {0}")]
    RoleNotDeclared(Role),

    /// No hostname matches the lookup pattern.
    #[error("no node hostname matches {0:?}")]
    HostNotFound(String),

    /// The topology itself is structurally invalid.
    #[error("malformed topology: {0}")]
    Malformed(String),
}

/// Errors that can occur in harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Topology malformed or a requested role/host is undeclared.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A session to a host could not be opened or initialized.
    #[error("connection to {host} failed: {reason}")]
    Connection {
        /// Target host.
        host: String,
        /// Failure detail.
        reason: String,
    },

    /// A running session failed while being read.
    #[error("read from {role} failed: {reason}")]
    Read {
        /// Role of the failing log source.
        role: Role,
        /// Failure detail.
        reason: String,
    },

    /// Controller failover needs exactly two candidates.
    #[error("unsupported topology: failover needs exactly 2 controller candidates, found {candidates}")]
    UnsupportedTopology {
        /// Number of controller candidates declared.
        candidates: usize,
    },

    /// Operation not valid in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// I/O error while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Returns true for connection failures (the failover trigger).
    pub fn is_connection(&self) -> bool {
        matches!(self, HarnessError::Connection { .. })
    }

    /// Returns true for topology/role configuration failures.
    pub fn is_config(&self) -> bool {
        matches!(self, HarnessError::Config(_))
    }
}
