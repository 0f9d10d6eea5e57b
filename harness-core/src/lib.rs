//! # harness-core
//!
//! Pure topology and failover logic for the cloudtest harness (no I/O).
//!
//! All modules in this crate are side-effect free queries and small state
//! machines over an immutable [`Topology`](harness_types::Topology):
//! - [`TopologyStore`] resolves roles to nodes and hostnames
//! - [`ControllerSelector`] tracks the active controller among two candidates
//! - [`Hypervisor`] is derived from the node controllers' distribution
//!
//! Sessions, log tailing and anything else that touches the network lives in
//! `harness-client`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod failover;
pub mod hypervisor;
pub mod topology;

pub use failover::ControllerSelector;
pub use hypervisor::Hypervisor;
pub use topology::TopologyStore;
