//! Topology store: role and host resolution over the node inventory.

use harness_types::{ConfigError, NetworkMode, Node, Role, Topology};

use crate::hypervisor::Hypervisor;

/// Read-only view over a validated [`Topology`].
///
/// Built once at startup; every method is a pure query.
#[derive(Debug, Clone)]
pub struct TopologyStore {
    topology: Topology,
}

impl TopologyStore {
    /// Validate `topology` and wrap it.
    pub fn new(topology: Topology) -> Result<Self, ConfigError> {
        topology.validate()?;
        Ok(Self { topology })
    }

    /// The underlying topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        self.topology.nodes()
    }

    /// Declared network mode.
    pub fn network_mode(&self) -> &NetworkMode {
        self.topology.network()
    }

    /// Every node declaring `role`, in declaration order.
    ///
    /// # Errors
    ///
    /// [`ConfigError::RoleNotDeclared`] if no node carries the role.
    pub fn resolve_role(&self, role: Role) -> Result<Vec<&Node>, ConfigError> {
        let nodes: Vec<&Node> = self
            .topology
            .nodes()
            .iter()
            .filter(|node| node.has_role(role))
            .collect();

        if nodes.is_empty() {
            return Err(ConfigError::RoleNotDeclared(role));
        }
        Ok(nodes)
    }

    /// Hostname of the first node declaring `role`.
    pub fn first_host_for(&self, role: Role) -> Result<&str, ConfigError> {
        let first: &Node = self.resolve_role(role)?[0];
        Ok(first.hostname())
    }

    /// First node whose hostname contains `pattern`.
    pub fn lookup_by_host(&self, pattern: &str) -> Result<&Node, ConfigError> {
        self.topology
            .nodes()
            .iter()
            .find(|node| node.hostname().contains(pattern))
            .ok_or_else(|| ConfigError::HostNotFound(pattern.to_string()))
    }

    /// Turn a role tag or a hostname into a hostname.
    ///
    /// Anything that parses as a role resolves to that role's first host;
    /// anything else is returned unchanged.
    pub fn resolve_target<'a>(&'a self, target: &'a str) -> Result<&'a str, ConfigError> {
        match target.parse::<Role>() {
            Ok(role) => self.first_host_for(role),
            Err(_) => Ok(target),
        }
    }

    /// Controller failover candidates, in declaration order.
    pub fn controllers(&self) -> Result<Vec<&Node>, ConfigError> {
        self.resolve_role(Role::CONTROLLER)
    }

    /// Hypervisor used by the node controllers.
    ///
    /// Detection uses the first node carrying any node-controller role.
    /// `Ok(None)` means the distribution is not one the harness knows.
    pub fn hypervisor(&self) -> Result<Option<Hypervisor>, ConfigError> {
        let node = self
            .topology
            .nodes()
            .iter()
            .find(|node| node.roles().iter().any(Role::is_node_controller))
            .ok_or(ConfigError::RoleNotDeclared(Role::NodeController(0)))?;
        Ok(Hypervisor::detect(node.distro(), node.distro_version()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_types::SourceMode;

    fn node(host: &str, distro: &str, version: &str, roles: &[Role]) -> Node {
        Node::new(host, distro, version, "64", SourceMode::Repo, roles.iter().copied())
    }

    fn two_clc_store() -> TopologyStore {
        TopologyStore::new(Topology::new(
            NetworkMode::new("managed"),
            vec![
                node(
                    "clc1.example.com",
                    "centos",
                    "5.7",
                    &[Role::CloudController, Role::ClusterController(0)],
                ),
                node("clc2.example.com", "centos", "5.7", &[Role::CloudController, Role::Walrus]),
                node("sc.example.com", "centos", "5.7", &[Role::StorageController(0)]),
                node("nc1.example.com", "rhel", "6.2", &[Role::NodeController(0)]),
                node("nc2.example.com", "rhel", "6.2", &[Role::NodeController(0)]),
            ],
        ))
        .unwrap()
    }

    // ===========================================
    // Role Resolution Tests
    // ===========================================

    #[test]
    fn resolve_role_returns_exactly_declaring_nodes() {
        let store = two_clc_store();
        let all_roles = [
            Role::CloudController,
            Role::Walrus,
            Role::StorageController(0),
            Role::ClusterController(0),
            Role::NodeController(0),
        ];

        for role in all_roles {
            let resolved = store.resolve_role(role).unwrap();
            let expected: Vec<&Node> = store.nodes().iter().filter(|n| n.has_role(role)).collect();
            assert!(!resolved.is_empty());
            assert_eq!(resolved, expected, "mismatch for {}", role);
        }
    }

    #[test]
    fn resolve_role_keeps_declaration_order() {
        let store = two_clc_store();
        let hosts: Vec<&str> = store
            .resolve_role(Role::NodeController(0))
            .unwrap()
            .into_iter()
            .map(|n| n.hostname())
            .collect();
        assert_eq!(hosts, vec!["nc1.example.com", "nc2.example.com"]);
    }

    #[test]
    fn resolve_undeclared_role_fails() {
        let store = two_clc_store();
        let err = store.resolve_role(Role::NodeController(1)).unwrap_err();
        assert_eq!(err, ConfigError::RoleNotDeclared(Role::NodeController(1)));
    }

    #[test]
    fn first_host_for_role() {
        let store = two_clc_store();
        assert_eq!(store.first_host_for(Role::CloudController).unwrap(), "clc1.example.com");
        assert_eq!(store.first_host_for(Role::Walrus).unwrap(), "clc2.example.com");
        assert!(matches!(
            store.first_host_for(Role::ClusterController(1)),
            Err(ConfigError::RoleNotDeclared(_))
        ));
    }

    // ===========================================
    // Host Lookup Tests
    // ===========================================

    #[test]
    fn lookup_by_host_substring() {
        let store = two_clc_store();
        assert_eq!(store.lookup_by_host("sc.example").unwrap().hostname(), "sc.example.com");
        // First match wins
        assert_eq!(store.lookup_by_host("nc").unwrap().hostname(), "nc1.example.com");
    }

    #[test]
    fn lookup_by_host_not_found() {
        let store = two_clc_store();
        assert_eq!(
            store.lookup_by_host("walrus.internal").unwrap_err(),
            ConfigError::HostNotFound("walrus.internal".into())
        );
    }

    #[test]
    fn resolve_target_accepts_role_or_host() {
        let store = two_clc_store();
        assert_eq!(store.resolve_target("clc").unwrap(), "clc1.example.com");
        assert_eq!(store.resolve_target("SC00").unwrap(), "sc.example.com");
        assert_eq!(store.resolve_target("10.0.0.5").unwrap(), "10.0.0.5");
        assert!(store.resolve_target("nc07").is_err());
        // Not a two-digit role tag, so treated as a hostname
        assert_eq!(store.resolve_target("nc1").unwrap(), "nc1");
    }

    // ===========================================
    // Derived Property Tests
    // ===========================================

    #[test]
    fn controllers_are_clc_nodes() {
        let store = two_clc_store();
        let hosts: Vec<&str> = store.controllers().unwrap().into_iter().map(|n| n.hostname()).collect();
        assert_eq!(hosts, vec!["clc1.example.com", "clc2.example.com"]);
    }

    #[test]
    fn hypervisor_from_node_controllers() {
        let store = two_clc_store();
        assert_eq!(store.hypervisor().unwrap(), Some(Hypervisor::Kvm));
    }

    #[test]
    fn hypervisor_without_node_controller_fails() {
        let store = TopologyStore::new(Topology::new(
            NetworkMode::new("system"),
            vec![node("clc", "centos", "5.7", &[Role::CloudController])],
        ))
        .unwrap();
        assert!(matches!(store.hypervisor(), Err(ConfigError::RoleNotDeclared(_))));
    }

    #[test]
    fn network_mode_exposed() {
        assert_eq!(two_clc_store().network_mode().as_str(), "managed");
    }

    #[test]
    fn store_rejects_malformed_topology() {
        let result = TopologyStore::new(Topology::new(NetworkMode::new("managed"), vec![]));
        assert!(matches!(result, Err(ConfigError::Malformed(_))));
    }
}
