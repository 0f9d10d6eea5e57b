//! Hypervisor detection from a node controller's distribution.

use std::fmt;

/// Hypervisor the node controllers run instances on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hypervisor {
    /// Linux KVM (RHEL/CentOS 6, Ubuntu).
    Kvm,
    /// Xen (RHEL/CentOS 5).
    Xen,
    /// VMware ESX/ESXi.
    Vmware,
}

impl Hypervisor {
    /// Map a distribution name and version to its hypervisor.
    ///
    /// Matching is case-insensitive. Returns `None` for combinations the
    /// harness does not support.
    pub fn detect(distro: &str, version: &str) -> Option<Self> {
        let distro = distro.to_ascii_lowercase();

        if distro.contains("vmware") {
            return Some(Hypervisor::Vmware);
        }
        if distro.contains("rhel") || distro.contains("centos") {
            if version.starts_with("6.") {
                return Some(Hypervisor::Kvm);
            }
            if version.starts_with("5.") {
                return Some(Hypervisor::Xen);
            }
            return None;
        }
        if distro.contains("ubuntu") {
            return Some(Hypervisor::Kvm);
        }
        None
    }
}

impl fmt::Display for Hypervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hypervisor::Kvm => write!(f, "kvm"),
            Hypervisor::Xen => write!(f, "xen"),
            Hypervisor::Vmware => write!(f, "vmware"),
        }
    }
}
