//! Node and topology data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::ConfigError;
use crate::role::Role;

/// How the platform was installed on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Installed from distribution packages.
    #[serde(alias = "REPO", alias = "Repo")]
    Repo,
    /// Built from a source checkout.
    #[serde(alias = "BZR", alias = "bzr", alias = "SOURCE", alias = "Source")]
    Source,
}

impl SourceMode {
    /// Filesystem prefix of the install. Always ends with `/`.
    pub fn install_root(&self) -> &'static str {
        match self {
            SourceMode::Repo => "/",
            SourceMode::Source => "/opt/eucalyptus/",
        }
    }
}

/// One machine of the cluster under test. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    hostname: String,
    distro: String,
    distro_version: String,
    arch: String,
    source: SourceMode,
    roles: BTreeSet<Role>,
}

impl Node {
    /// Create a node description.
    pub fn new(
        hostname: impl Into<String>,
        distro: impl Into<String>,
        distro_version: impl Into<String>,
        arch: impl Into<String>,
        source: SourceMode,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            distro: distro.into(),
            distro_version: distro_version.into(),
            arch: arch.into(),
            source,
            roles: roles.into_iter().collect(),
        }
    }

    /// Hostname or IP address used to reach the node.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Distribution name (`centos`, `rhel`, `ubuntu`, `vmware`...).
    pub fn distro(&self) -> &str {
        &self.distro
    }

    /// Distribution version string.
    pub fn distro_version(&self) -> &str {
        &self.distro_version
    }

    /// Base architecture (`32` or `64`).
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Install mode.
    pub fn source(&self) -> SourceMode {
        self.source
    }

    /// Roles declared on this node.
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// Returns true if the node declares `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Install prefix derived from the source mode.
    pub fn install_root(&self) -> &'static str {
        self.source.install_root()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<String> = self.roles.iter().map(Role::to_string).collect();
        write!(
            f,
            "{} {} {} {} [{}]",
            self.hostname,
            self.distro,
            self.distro_version,
            self.arch,
            roles.join(" ")
        )
    }
}

/// Network mode tag of the cloud under test (`managed`, `managed-novlan`...).
///
/// Stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NetworkMode(String);

impl NetworkMode {
    /// Create a network mode tag.
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().to_ascii_lowercase())
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NetworkMode {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<NetworkMode> for String {
    fn from(mode: NetworkMode) -> Self {
        mode.0
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The declared node inventory for one test run.
///
/// The node list is fixed at construction; there is no way to add or
/// remove nodes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    network: NetworkMode,
    nodes: Vec<Node>,
}

impl Topology {
    /// Create a topology from an already-parsed node list.
    pub fn new(network: NetworkMode, nodes: Vec<Node>) -> Self {
        Self { network, nodes }
    }

    /// Network mode tag.
    pub fn network(&self) -> &NetworkMode {
        &self.network
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Check structural validity: at least one node, and every hostname
    /// non-empty and unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::Malformed("topology declares no nodes".into()));
        }

        let mut seen = BTreeSet::new();
        for node in &self.nodes {
            let host = node.hostname.trim();
            if host.is_empty() {
                return Err(ConfigError::Malformed("node with empty hostname".into()));
            }
            if !seen.insert(host) {
                return Err(ConfigError::Malformed(format!(
                    "duplicate hostname: {}",
                    host
                )));
            }
        }
        Ok(())
    }
}
