//! Remote session abstraction for the cloudtest harness.
//!
//! A provider opens one long-lived session per host. The harness only needs
//! a narrow contract from it:
//! - `open()` establishes a session to a host
//! - `send()` writes a command, fire-and-forget
//! - `poll_read()` returns whatever output is ready, waiting at most `timeout`
//! - `close()` terminates the session
//!
//! # Example
//!
//! ```ignore
//! let provider = MockSessionProvider::new();
//! let mut session = provider.open("clc.example.com", &Credentials::default()).await?;
//! session.send("tail -F /var/log/eucalyptus/cloud-output.log").await?;
//! let ready = session.poll_read(Duration::ZERO).await?;
//! ```

mod mock;
mod ssh;

pub use mock::{MockSession, MockSessionProvider};
pub use ssh::{SshOptions, SshSession, SshSessionProvider};

use async_trait::async_trait;
use harness_types::Credentials;
use std::time::Duration;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Writing a command failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading output failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Remote end closed the session.
    #[error("session closed")]
    Closed,

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A live session on one remote host.
#[async_trait]
pub trait Session: Send {
    /// Send a command to the remote shell.
    async fn send(&mut self, command: &str) -> Result<(), SessionError>;

    /// Return output that is ready now.
    ///
    /// Waits at most `timeout`; with `Duration::ZERO` it never blocks. An
    /// empty vector means nothing was ready.
    async fn poll_read(&mut self, timeout: Duration) -> Result<Vec<u8>, SessionError>;

    /// Close the session.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions to named hosts.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a session to `host`.
    async fn open(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn Session>, SessionError>;
}
