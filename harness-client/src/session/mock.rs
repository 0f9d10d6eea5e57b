//! Mock sessions for testing.
//!
//! Allows scripting per-poll output and failures, and capturing sent
//! commands for verification.

use super::{Session, SessionError, SessionProvider};
use async_trait::async_trait;
use harness_types::Credentials;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock session.
///
/// Each `poll_read()` consumes one scripted step. Once the script is
/// exhausted, polls return empty output. Clones share state, so a test can
/// keep a handle while the harness owns the boxed session.
#[derive(Debug, Default, Clone)]
pub struct MockSession {
    inner: Arc<Mutex<MockSessionInner>>,
}

#[derive(Debug, Default)]
struct MockSessionInner {
    script: VecDeque<Result<Vec<u8>, String>>,
    sent_commands: Vec<String>,
    poll_count: usize,
    closed: bool,
    fail_next_send: Option<String>,
}

impl MockSession {
    /// Create a new mock session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be returned by one future `poll_read()`.
    ///
    /// Queue an empty slice to script a poll that finds nothing ready.
    pub fn queue_output(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.script.push_back(Ok(data.to_vec()));
    }

    /// Queue a read failure at the current end of the script.
    pub fn queue_read_error(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.script.push_back(Err(error.to_string()));
    }

    /// Cause the next `send()` to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Commands sent so far.
    pub fn sent_commands(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_commands.clone()
    }

    /// Number of `poll_read()` calls so far.
    pub fn poll_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.poll_count
    }

    /// True once `close()` has been called.
    pub fn is_closed(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.closed
    }
}

#[async_trait]
impl Session for MockSession {
    async fn send(&mut self, command: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(SessionError::Closed);
        }
        if let Some(error) = inner.fail_next_send.take() {
            return Err(SessionError::SendFailed(error));
        }

        inner.sent_commands.push(command.to_string());
        Ok(())
    }

    async fn poll_read(&mut self, _timeout: Duration) -> Result<Vec<u8>, SessionError> {
        let mut inner = self.inner.lock().unwrap();
        inner.poll_count += 1;

        if inner.closed {
            return Err(SessionError::Closed);
        }

        match inner.script.pop_front() {
            Some(Ok(data)) => Ok(data),
            Some(Err(error)) => Err(SessionError::ReadFailed(error)),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        Ok(())
    }
}

/// Mock session provider.
///
/// Hands out one shared [`MockSession`] per host and records every open.
/// Opening a host whose session was closed reopens it with its remaining
/// script intact.
#[derive(Debug, Default, Clone)]
pub struct MockSessionProvider {
    inner: Arc<Mutex<MockProviderInner>>,
}

#[derive(Debug, Default)]
struct MockProviderInner {
    sessions: HashMap<String, MockSession>,
    fail_open: HashMap<String, String>,
    opened_hosts: Vec<String>,
    last_credentials: Option<Credentials>,
}

impl MockSessionProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// The session that `open(host)` will return, created on first use.
    pub fn session(&self, host: &str) -> MockSession {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.entry(host.to_string()).or_default().clone()
    }

    /// Cause every `open(host)` to fail with the given error.
    pub fn fail_open(&self, host: &str, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_open.insert(host.to_string(), error.to_string());
    }

    /// Stop failing opens to `host`.
    pub fn allow_open(&self, host: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_open.remove(host);
    }

    /// Hosts successfully opened, in order.
    pub fn opened_hosts(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.opened_hosts.clone()
    }

    /// Credentials passed to the most recent successful open.
    pub fn last_credentials(&self) -> Option<Credentials> {
        let inner = self.inner.lock().unwrap();
        inner.last_credentials.clone()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn open(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn Session>, SessionError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_open.get(host) {
            return Err(SessionError::ConnectionFailed(error.clone()));
        }

        inner.opened_hosts.push(host.to_string());
        inner.last_credentials = Some(credentials.clone());
        let session = inner.sessions.entry(host.to_string()).or_default().clone();
        session.inner.lock().unwrap().closed = false;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // MockSession Tests
    // ===========================================

    #[tokio::test]
    async fn polls_follow_script_then_go_idle() {
        let mut session = MockSession::new();
        session.queue_output(b"one");
        session.queue_output(b"");
        session.queue_output(b"two");

        assert_eq!(session.poll_read(Duration::ZERO).await.unwrap(), b"one");
        assert!(session.poll_read(Duration::ZERO).await.unwrap().is_empty());
        assert_eq!(session.poll_read(Duration::ZERO).await.unwrap(), b"two");
        assert!(session.poll_read(Duration::ZERO).await.unwrap().is_empty());
        assert_eq!(session.poll_count(), 4);
    }

    #[tokio::test]
    async fn scripted_read_error() {
        let mut session = MockSession::new();
        session.queue_read_error("channel reset");

        let result = session.poll_read(Duration::ZERO).await;
        assert!(matches!(result, Err(SessionError::ReadFailed(_))));
    }

    #[tokio::test]
    async fn records_sent_commands() {
        let mut session = MockSession::new();
        session.send("tail -F a.log").await.unwrap();
        session.send("uptime").await.unwrap();
        assert_eq!(session.sent_commands(), vec!["tail -F a.log", "uptime"]);
    }

    #[tokio::test]
    async fn forced_send_failure() {
        let mut session = MockSession::new();
        session.fail_next_send("broken pipe");

        assert!(matches!(
            session.send("ls").await,
            Err(SessionError::SendFailed(_))
        ));
        // Next send should work
        session.send("ls").await.unwrap();
    }

    #[tokio::test]
    async fn closed_session_rejects_io() {
        let mut session = MockSession::new();
        session.close().await.unwrap();

        assert!(session.is_closed());
        assert!(matches!(session.send("ls").await, Err(SessionError::Closed)));
        assert!(matches!(
            session.poll_read(Duration::ZERO).await,
            Err(SessionError::Closed)
        ));
    }

    // ===========================================
    // MockSessionProvider Tests
    // ===========================================

    #[tokio::test]
    async fn provider_shares_session_per_host() {
        let provider = MockSessionProvider::new();
        let handle = provider.session("clc");
        handle.queue_output(b"hi");

        let mut opened = provider.open("clc", &Credentials::default()).await.unwrap();
        assert_eq!(opened.poll_read(Duration::ZERO).await.unwrap(), b"hi");
        assert_eq!(handle.poll_count(), 1);
        assert_eq!(provider.opened_hosts(), vec!["clc"]);
    }

    #[tokio::test]
    async fn provider_forced_open_failure() {
        let provider = MockSessionProvider::new();
        provider.fail_open("nc1", "no route to host");

        let result = provider.open("nc1", &Credentials::default()).await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
        assert!(provider.opened_hosts().is_empty());

        provider.allow_open("nc1");
        assert!(provider.open("nc1", &Credentials::default()).await.is_ok());
    }

    #[tokio::test]
    async fn provider_reopens_closed_session() {
        let provider = MockSessionProvider::new();
        let mut first = provider.open("clc", &Credentials::default()).await.unwrap();
        first.close().await.unwrap();
        assert!(provider.session("clc").is_closed());

        let mut second = provider.open("clc", &Credentials::default()).await.unwrap();
        second.send("uptime").await.unwrap();
        assert!(!provider.session("clc").is_closed());
    }

    #[tokio::test]
    async fn provider_records_credentials() {
        let provider = MockSessionProvider::new();
        let creds = Credentials::new("admin").with_password("secret");
        provider.open("clc", &creds).await.unwrap();
        assert_eq!(provider.last_credentials(), Some(creds));
    }
}
