//! Role tags attached to nodes.
//!
//! Tags are parsed once at topology-load time. Matching a node against a
//! role is a set membership test, never a pattern match.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A logical responsibility carried by a node.
///
/// Cluster-scoped roles carry the cluster number they belong to, so
/// `cc00` and `cc01` are distinct roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Cloud controller (`clc`). The redundant "controller" role.
    CloudController,
    /// Walrus object storage (`ws`).
    Walrus,
    /// Storage controller for a cluster (`scNN`).
    StorageController(u8),
    /// Cluster controller (`ccNN`).
    ClusterController(u8),
    /// Node controller inside a cluster (`ncNN`).
    NodeController(u8),
}

impl Role {
    /// The role whose holders are failover candidates.
    pub const CONTROLLER: Role = Role::CloudController;

    /// Returns true for node controllers of any cluster.
    pub fn is_node_controller(&self) -> bool {
        matches!(self, Role::NodeController(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::CloudController => write!(f, "clc"),
            Role::Walrus => write!(f, "ws"),
            Role::StorageController(c) => write!(f, "sc{:02}", c),
            Role::ClusterController(c) => write!(f, "cc{:02}", c),
            Role::NodeController(c) => write!(f, "nc{:02}", c),
        }
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "clc" => return Ok(Role::CloudController),
            "ws" => return Ok(Role::Walrus),
            _ => {}
        }

        let unknown = || ConfigError::UnknownRole(s.to_string());
        // Two-letter prefix, two-digit cluster number
        if tag.len() != 4 || !tag.is_char_boundary(2) {
            return Err(unknown());
        }
        let (prefix, digits) = tag.split_at(2);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let cluster: u8 = digits.parse().map_err(|_| unknown())?;

        match prefix {
            "sc" => Ok(Role::StorageController(cluster)),
            "cc" => Ok(Role::ClusterController(cluster)),
            "nc" => Ok(Role::NodeController(cluster)),
            _ => Err(unknown()),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}
