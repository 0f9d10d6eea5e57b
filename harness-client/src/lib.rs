//! # cloudtest-harness-client
//!
//! Remote-facing half of the cloudtest harness.
//!
//! ## Features
//!
//! - **Session Abstraction**: Pluggable remote sessions (ssh, mock)
//! - **Log Aggregation**: One background loop tails logs from many hosts
//! - **Controller Failover**: One-shot swap-and-retry against a redundant pair
//!
//! ## Example
//!
//! ```ignore
//! use harness_client::{AggregatorConfig, LogAggregator, SshOptions, SshSessionProvider};
//!
//! let provider = SshSessionProvider::new(SshOptions::default());
//! let mut aggregator = LogAggregator::new(provider, AggregatorConfig::default());
//!
//! aggregator.start(&store, &[Role::CloudController, Role::NodeController(0)]).await?;
//! // ... exercise the cloud ...
//! aggregator.stop().await?;
//! aggregator.save("run-42-").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod controller;
pub mod session;

pub use aggregator::{
    default_log_file, AggregatorConfig, AggregatorState, LogAggregator, LogSource, SourceHealth,
    DEFAULT_POLL_INTERVAL,
};
pub use controller::{open_active_controller, with_controller_failover};
pub use session::{
    MockSession, MockSessionProvider, Session, SessionError, SessionProvider, SshOptions,
    SshSession, SshSessionProvider,
};
