//! # harness-types
//!
//! Foundational types for the cloudtest multi-node test harness.
//!
//! This crate provides the data model shared by every other harness crate:
//! - [`Role`] - Validated role tags (`clc`, `ws`, `sc00`, `cc00`, `nc00`)
//! - [`Node`], [`SourceMode`] - One machine of the cluster under test
//! - [`Topology`], [`NetworkMode`] - The declared node inventory for a run
//! - [`Credentials`] - Login material handed to session providers
//! - [`HarnessError`], [`ConfigError`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod credentials;
mod error;
mod node;
mod role;

pub use credentials::Credentials;
pub use error::{ConfigError, HarnessError};
pub use node::{NetworkMode, Node, SourceMode, Topology};
pub use role::Role;
