//! Multi-host log stream aggregation.
//!
//! [`LogAggregator`] opens one session per watched role, starts a
//! continuous-output command on each, and runs a single background loop
//! that polls every healthy session without blocking and appends whatever
//! is ready to that role's [`LogSource`] buffer.
//!
//! ```text
//!   clc ──session──┐
//!   cc00 ─session──┼──► poll loop (one task) ──► LogSource buffers ──► save()
//!   nc00 ─session──┘
//! ```
//!
//! The loop is the only writer to the buffers. Readers (`save()`,
//! [`LogSource::snapshot`]) take the per-source read lock, so they always
//! observe whole appended chunks.

use harness_core::TopologyStore;
use harness_types::{Credentials, HarnessError, Node, Role};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::session::{Session, SessionProvider};

/// Default wait between poll iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Log file a role writes to, relative to `<install_root>var/log/eucalyptus/`.
pub fn default_log_file(role: Role) -> &'static str {
    match role {
        Role::CloudController | Role::Walrus | Role::StorageController(_) => "cloud-output.log",
        Role::ClusterController(_) => "cc.log",
        Role::NodeController(_) => "nc.log",
    }
}

/// Aggregator settings.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Wait between poll iterations (default: 1s).
    pub poll_interval: Duration,
    /// Per-session readiness wait inside an iteration (default: zero).
    pub read_timeout: Duration,
    /// Credentials used to open every session.
    pub credentials: Credentials,
    /// Per-role log path overrides (absolute remote paths).
    pub log_paths: HashMap<Role, String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: Duration::ZERO,
            credentials: Credentials::default(),
            log_paths: HashMap::new(),
        }
    }
}

impl AggregatorConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set session credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Override the log path tailed for `role`.
    pub fn with_log_path(mut self, role: Role, path: &str) -> Self {
        self.log_paths.insert(role, path.to_string());
        self
    }

    /// Remote log path watched for `role` on `node`.
    pub fn log_path(&self, role: Role, node: &Node) -> String {
        match self.log_paths.get(&role) {
            Some(path) => path.clone(),
            None => format!(
                "{}var/log/eucalyptus/{}",
                node.install_root(),
                default_log_file(role)
            ),
        }
    }

    /// Continuous-output command started on the role's session.
    pub fn tail_command(&self, role: Role, node: &Node) -> String {
        format!("tail -F {}", self.log_path(role, node))
    }
}

/// Health of a log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceHealth {
    /// Still being polled.
    Healthy,
    /// Excluded from polling after a read error.
    Broken {
        /// Error that broke the source.
        reason: String,
    },
}

/// Accumulated output of one watched role.
#[derive(Debug)]
pub struct LogSource {
    role: Role,
    host: String,
    buffer: RwLock<Vec<u8>>,
    health: RwLock<SourceHealth>,
}

impl LogSource {
    fn new(role: Role, host: &str) -> Self {
        Self {
            role,
            host: host.to_string(),
            buffer: RwLock::new(Vec::new()),
            health: RwLock::new(SourceHealth::Healthy),
        }
    }

    /// Role being watched.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Host the session is attached to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Copy of the buffer as of now.
    pub async fn snapshot(&self) -> Vec<u8> {
        self.buffer.read().await.clone()
    }

    /// Bytes accumulated so far.
    pub async fn len(&self) -> usize {
        self.buffer.read().await.len()
    }

    /// True if nothing has been received.
    pub async fn is_empty(&self) -> bool {
        self.buffer.read().await.is_empty()
    }

    /// Discard everything accumulated so far.
    pub async fn clear(&self) {
        self.buffer.write().await.clear();
    }

    /// Current health.
    pub async fn health(&self) -> SourceHealth {
        self.health.read().await.clone()
    }

    /// True while the source is still polled.
    pub async fn is_healthy(&self) -> bool {
        *self.health.read().await == SourceHealth::Healthy
    }

    async fn append(&self, chunk: &[u8]) {
        self.buffer.write().await.extend_from_slice(chunk);
    }

    async fn mark_broken(&self, reason: String) {
        *self.health.write().await = SourceHealth::Broken { reason };
    }
}

/// Lifecycle state of the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// No poll loop running.
    Idle,
    /// Poll loop active.
    Running,
}

/// Session plus the source it feeds. Owned by the poll loop.
struct Attached {
    session: Box<dyn Session>,
    source: Arc<LogSource>,
    healthy: bool,
}

struct PollTask {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Tails logs from several hosts at once.
///
/// State machine: `Idle → Running → Idle`. Sources from the last run stay
/// readable after `stop()` until the next `start()`.
pub struct LogAggregator<P: SessionProvider> {
    provider: P,
    config: AggregatorConfig,
    sources: Vec<Arc<LogSource>>,
    task: Option<PollTask>,
}

impl<P: SessionProvider> LogAggregator<P> {
    /// Create an idle aggregator.
    pub fn new(provider: P, config: AggregatorConfig) -> Self {
        Self {
            provider,
            config,
            sources: Vec::new(),
            task: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AggregatorState {
        if self.task.is_some() {
            AggregatorState::Running
        } else {
            AggregatorState::Idle
        }
    }

    /// True while the poll loop is active.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Sources of the current (or last) run, in start order.
    pub fn sources(&self) -> &[Arc<LogSource>] {
        &self.sources
    }

    /// Source watching `role`, if any.
    pub fn source(&self, role: Role) -> Option<&Arc<LogSource>> {
        self.sources.iter().find(|s| s.role() == role)
    }

    /// Attach to every role in `roles` and start polling.
    ///
    /// Repeated roles are watched once. All roles are resolved before any
    /// session is opened. Startup is all-or-nothing: if any session fails to
    /// open or to start its command, every session opened so far is closed
    /// and no source is retained.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::InvalidState`] if already running or `roles` is empty
    /// - [`HarnessError::Config`] if a role is not declared
    /// - [`HarnessError::Connection`] if a session cannot be started
    pub async fn start(&mut self, store: &TopologyStore, roles: &[Role]) -> Result<(), HarnessError> {
        if self.task.is_some() {
            return Err(HarnessError::InvalidState("aggregator already running".into()));
        }
        self.sources.clear();

        let mut wanted: Vec<Role> = Vec::with_capacity(roles.len());
        for role in roles {
            if !wanted.contains(role) {
                wanted.push(*role);
            }
        }
        if wanted.is_empty() {
            return Err(HarnessError::InvalidState("no roles to watch".into()));
        }

        let mut targets = Vec::with_capacity(wanted.len());
        for role in wanted {
            let node: &Node = store.resolve_role(role)?[0];
            targets.push((role, node.hostname().to_string(), self.config.tail_command(role, node)));
        }

        let mut attached: Vec<Attached> = Vec::with_capacity(targets.len());
        for (role, host, command) in targets {
            match self.attach(role, &host, &command).await {
                Ok(entry) => attached.push(entry),
                Err(err) => {
                    tracing::warn!(%role, %host, error = %err, "startup failed; closing opened sessions");
                    for mut entry in attached {
                        if let Err(e) = entry.session.close().await {
                            tracing::debug!(role = %entry.source.role(), "close failed: {}", e);
                        }
                    }
                    return Err(err);
                }
            }
        }

        self.sources = attached.iter().map(|a| Arc::clone(&a.source)).collect();

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(poll_loop(
            attached,
            Arc::clone(&cancel),
            self.config.poll_interval,
            self.config.read_timeout,
        ));
        self.task = Some(PollTask { cancel, handle });

        tracing::info!(
            sources = self.sources.len(),
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "log aggregation started"
        );
        Ok(())
    }

    async fn attach(&self, role: Role, host: &str, command: &str) -> Result<Attached, HarnessError> {
        let mut session = self
            .provider
            .open(host, &self.config.credentials)
            .await
            .map_err(|e| HarnessError::Connection {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        if let Err(e) = session.send(command).await {
            if let Err(close_err) = session.close().await {
                tracing::debug!(%role, %host, "close failed: {}", close_err);
            }
            return Err(HarnessError::Connection {
                host: host.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::debug!(%role, %host, %command, "log source attached");
        Ok(Attached {
            session,
            source: Arc::new(LogSource::new(role, host)),
            healthy: true,
        })
    }

    /// Stop polling and wait for the loop to exit.
    ///
    /// Returns within one poll interval plus one iteration. Stopping an idle
    /// aggregator does nothing.
    pub async fn stop(&mut self) -> Result<(), HarnessError> {
        let Some(task) = self.task.take() else {
            tracing::debug!("stop called on idle aggregator");
            return Ok(());
        };

        task.cancel.store(true, Ordering::Release);
        task.handle
            .await
            .map_err(|e| HarnessError::InvalidState(format!("poll loop failed: {}", e)))?;

        tracing::info!("log aggregation stopped");
        Ok(())
    }

    /// Write every buffer to `{prefix}{role}.log`, replacing prior content.
    ///
    /// Buffers are not cleared. Returns the written paths in source order.
    pub async fn save(&self, prefix: &str) -> Result<Vec<PathBuf>, HarnessError> {
        let mut written = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let path = PathBuf::from(format!("{}{}.log", prefix, source.role()));
            let contents = source.snapshot().await;
            tokio::fs::write(&path, &contents).await?;
            tracing::debug!(role = %source.role(), bytes = contents.len(), path = %path.display(), "saved log");
            written.push(path);
        }
        Ok(written)
    }
}

impl<P: SessionProvider> Drop for LogAggregator<P> {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.cancel.store(true, Ordering::Release);
        }
    }
}

async fn poll_loop(
    mut attached: Vec<Attached>,
    cancel: Arc<AtomicBool>,
    poll_interval: Duration,
    read_timeout: Duration,
) {
    let mut iteration: u64 = 0;

    while !cancel.load(Ordering::Acquire) {
        iteration += 1;

        for entry in attached.iter_mut().filter(|e| e.healthy) {
            match entry.session.poll_read(read_timeout).await {
                Ok(chunk) if chunk.is_empty() => {}
                Ok(chunk) => {
                    tracing::debug!(role = %entry.source.role(), bytes = chunk.len(), "appending");
                    entry.source.append(&chunk).await;
                }
                Err(e) => {
                    let err = HarnessError::Read {
                        role: entry.source.role(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(
                        host = %entry.source.host(),
                        iteration,
                        "log source broken, no longer polled: {}",
                        err
                    );
                    entry.healthy = false;
                    entry.source.mark_broken(err.to_string()).await;
                }
            }
        }

        tokio::time::sleep(poll_interval).await;
    }

    for entry in &mut attached {
        if let Err(e) = entry.session.close().await {
            tracing::debug!(role = %entry.source.role(), "close failed: {}", e);
        }
    }
    tracing::debug!(iterations = iteration, "poll loop exited");
}
