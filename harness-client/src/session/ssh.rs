//! SSH-backed sessions.
//!
//! Uses `tokio::process::Command` to run `ssh` with a remote `sh` reading
//! commands from stdin. Password logins go through `sshpass -e`; otherwise
//! `BatchMode` is forced and keys must be pre-configured.

use super::{Session, SessionError, SessionProvider};
use async_trait::async_trait;
use harness_types::Credentials;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// Line the remote shell echoes once it is ready for commands.
const READY_MARKER: &str = "__cloudtest_session_ready__";

/// How long a failed open waits to collect ssh's diagnostics.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Options for [`SshSessionProvider`].
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// SSH client binary (default: `ssh`).
    pub program: String,
    /// Connect timeout, also bounding the wait for the remote shell.
    pub connect_timeout: Duration,
    /// Verify host keys against known_hosts (default: false).
    pub strict_host_key_checking: bool,
    /// Remote port, if not the default.
    pub port: Option<u16>,
    /// Maximum bytes returned by a single `poll_read()` (default: 64 KiB).
    pub read_chunk: usize,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            connect_timeout: Duration::from_secs(30),
            strict_host_key_checking: false,
            port: None,
            read_chunk: 64 * 1024,
        }
    }
}

/// Session provider that shells out to `ssh`.
#[derive(Debug, Clone, Default)]
pub struct SshSessionProvider {
    options: SshOptions,
}

impl SshSessionProvider {
    /// Create a provider with the given options.
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// Provider options.
    pub fn options(&self) -> &SshOptions {
        &self.options
    }

    fn build_command(&self, host: &str, credentials: &Credentials) -> Command {
        let mut cmd = match &credentials.password {
            Some(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg(&self.options.program);
                cmd.env("SSHPASS", password);
                cmd
            }
            None => Command::new(&self.options.program),
        };

        let host_key_checking = if self.options.strict_host_key_checking {
            "yes"
        } else {
            "no"
        };
        cmd.arg("-o")
            .arg(format!("StrictHostKeyChecking={}", host_key_checking))
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.options.connect_timeout.as_secs().max(1)
            ))
            .arg("-T");

        if credentials.password.is_none() {
            cmd.arg("-o").arg("BatchMode=yes");
        }
        if let Some(key) = &credentials.key_path {
            cmd.arg("-i").arg(key);
        }
        if let Some(port) = self.options.port {
            cmd.arg("-p").arg(port.to_string());
        }

        cmd.arg(format!("{}@{}", credentials.username, host)).arg("sh");
        cmd
    }
}

#[async_trait]
impl SessionProvider for SshSessionProvider {
    async fn open(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn Session>, SessionError> {
        let cmd = self.build_command(host, credentials);
        let session = SshSession::spawn(host, cmd, &self.options).await?;
        Ok(Box::new(session))
    }
}

/// A remote shell over a child `ssh` process.
pub struct SshSession {
    host: String,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    pending: Vec<u8>,
    scratch: Vec<u8>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("host", &self.host)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl SshSession {
    /// Spawn `cmd` as a shell session and wait until it answers.
    ///
    /// `cmd` must run a POSIX shell that reads commands from stdin. Output
    /// printed before the shell is ready (banners, motd) is discarded. If the
    /// shell never becomes ready, whatever the child wrote to stderr is
    /// included in the error. Once ready, stderr is forwarded to `debug!`.
    pub async fn spawn(
        host: &str,
        mut cmd: Command,
        options: &SshOptions,
    ) -> Result<Self, SessionError> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SessionError::ConnectionFailed(format!("spawn failed: {}", e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::ConnectionFailed("stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::ConnectionFailed("stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SessionError::ConnectionFailed("stderr not captured".into()))?;

        let mut session = Self {
            host: host.to_string(),
            child,
            stdin,
            stdout,
            pending: Vec::new(),
            scratch: vec![0u8; options.read_chunk.max(1)],
        };

        let ready = match session.send(&format!("echo {}", READY_MARKER)).await {
            Err(e) => Err(format!("shell did not start: {}", e)),
            Ok(()) => {
                match tokio::time::timeout(options.connect_timeout, session.wait_until_ready())
                    .await
                {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(format!("shell did not start: {}", e)),
                    Err(_) => Err("timed out waiting for shell".to_string()),
                }
            }
        };

        match ready {
            Ok(()) => {
                tracing::debug!(%host, "session ready");
                tokio::spawn(forward_stderr(host.to_string(), stderr));
                Ok(session)
            }
            Err(reason) => {
                let diagnostics = collect_stderr(&mut stderr).await;
                let message = if diagnostics.is_empty() {
                    format!("{}: {}", host, reason)
                } else {
                    format!("{}: {}: {}", host, reason, diagnostics)
                };
                Err(SessionError::ConnectionFailed(message))
            }
        }
    }

    async fn wait_until_ready(&mut self) -> Result<(), SessionError> {
        let marker = format!("{}\n", READY_MARKER).into_bytes();
        let mut seen = Vec::new();

        loop {
            let n = self.stdout.read(&mut self.scratch).await?;
            if n == 0 {
                return Err(SessionError::Closed);
            }
            seen.extend_from_slice(&self.scratch[..n]);

            if let Some(pos) = find_subslice(&seen, &marker) {
                // Bytes after the marker are real output
                self.pending = seen.split_off(pos + marker.len());
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl Session for SshSession {
    async fn send(&mut self, command: &str) -> Result<(), SessionError> {
        let mut line = command.to_string();
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::SendFailed(e.to_string()))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| SessionError::SendFailed(e.to_string()))
    }

    async fn poll_read(&mut self, timeout: Duration) -> Result<Vec<u8>, SessionError> {
        if !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }

        // A read that is not ready within `timeout` is dropped; ChildStdout
        // reads are cancel-safe, so no bytes are lost.
        match tokio::time::timeout(timeout, self.stdout.read(&mut self.scratch)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) => Err(SessionError::Closed),
            Ok(Ok(n)) => Ok(self.scratch[..n].to_vec()),
            Ok(Err(e)) => Err(SessionError::ReadFailed(e.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.stdin.shutdown().await {
            tracing::debug!(host = %self.host, "stdin shutdown failed: {}", e);
        }
        if self.child.try_wait()?.is_none() {
            self.child.start_kill()?;
        }
        self.child.wait().await?;
        Ok(())
    }
}

/// Read what the child wrote to stderr, waiting at most [`STDERR_GRACE`].
async fn collect_stderr(stderr: &mut ChildStderr) -> String {
    let mut buf = Vec::new();
    match tokio::time::timeout(STDERR_GRACE, stderr.read_to_end(&mut buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::debug!("reading ssh stderr failed: {}", e),
        // Child still running; keep what arrived so far
        Err(_) => {}
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Log stderr lines of a live session until the child exits.
async fn forward_stderr(host: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!(%host, "stderr: {}", line),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%host, "stderr closed: {}", e);
                break;
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn local_shell() -> Command {
        Command::new("sh")
    }

    async fn read_until(session: &mut SshSession, needle: &str) -> String {
        let mut out = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !String::from_utf8_lossy(&out).contains(needle) {
                let chunk = session.poll_read(Duration::from_millis(50)).await.unwrap();
                out.extend_from_slice(&chunk);
            }
        })
        .await
        .expect("expected output never arrived");
        String::from_utf8_lossy(&out).into_owned()
    }

    // ===========================================
    // Command Construction Tests
    // ===========================================

    #[test]
    fn key_based_command_uses_batch_mode() {
        let provider = SshSessionProvider::default();
        let creds = Credentials::new("root").with_key_path("/keys/id_rsa");
        let cmd = provider.build_command("clc.example.com", &creds);

        assert_eq!(cmd.as_std().get_program(), "ssh");
        let args = args_of(&cmd);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.contains(&"ConnectTimeout=30".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/keys/id_rsa"));
        assert_eq!(&args[args.len() - 2..], ["root@clc.example.com", "sh"]);
    }

    #[test]
    fn password_command_goes_through_sshpass() {
        let provider = SshSessionProvider::new(SshOptions {
            port: Some(2222),
            strict_host_key_checking: true,
            ..SshOptions::default()
        });
        let creds = Credentials::new("admin").with_password("hunter2");
        let cmd = provider.build_command("nc1", &creds);

        assert_eq!(cmd.as_std().get_program(), "sshpass");
        let args = args_of(&cmd);
        assert_eq!(&args[..2], ["-e", "ssh"]);
        assert!(!args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=yes".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-p" && w[1] == "2222"));
        // Password travels in the environment, never on the command line
        assert!(!args.iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn find_subslice_positions() {
        assert_eq!(find_subslice(b"abcdef", b"cd"), Some(2));
        assert_eq!(find_subslice(b"abc", b"x"), None);
        assert_eq!(find_subslice(b"ab", b"abc"), None);
    }

    // ===========================================
    // Local Shell Session Tests
    // ===========================================

    #[tokio::test]
    async fn local_shell_session_runs_commands() {
        let mut session = SshSession::spawn("localhost", local_shell(), &SshOptions::default())
            .await
            .unwrap();

        session.send("echo hello-from-shell").await.unwrap();
        let out = read_until(&mut session, "hello-from-shell").await;
        assert!(!out.contains(READY_MARKER));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn zero_timeout_poll_does_not_block() {
        let mut session = SshSession::spawn("localhost", local_shell(), &SshOptions::default())
            .await
            .unwrap();
        let started = std::time::Instant::now();
        let out = session.poll_read(Duration::ZERO).await.unwrap();
        assert!(out.is_empty());
        assert!(started.elapsed() < Duration::from_millis(500));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn exited_shell_reports_closed() {
        let mut session = SshSession::spawn("localhost", local_shell(), &SshOptions::default())
            .await
            .unwrap();
        session.send("exit 0").await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match session.poll_read(Duration::from_millis(50)).await {
                    Ok(_) => continue,
                    Err(e) => return e,
                }
            }
        })
        .await
        .expect("shell never exited");
        assert!(matches!(result, SessionError::Closed));
    }

    #[tokio::test]
    async fn spawn_failure_is_connection_error() {
        let cmd = Command::new("/nonexistent/cloudtest-shell");
        let result = SshSession::spawn("nowhere", cmd, &SshOptions::default()).await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn shell_that_exits_immediately_fails_open() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 1");
        let result = SshSession::spawn("broken", cmd, &SshOptions::default()).await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn failed_open_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("echo 'root@clc: Permission denied (publickey).' >&2; exit 255");

        let err = SshSession::spawn("clc", cmd, &SshOptions::default())
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, SessionError::ConnectionFailed(_)));
        assert!(message.contains("clc"), "{}", message);
        assert!(message.contains("Permission denied (publickey)."), "{}", message);
    }

    #[tokio::test]
    async fn timed_out_open_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo 'Connection timed out during banner exchange' >&2; sleep 5");
        let options = SshOptions {
            connect_timeout: Duration::from_millis(200),
            ..SshOptions::default()
        };

        let err = SshSession::spawn("nc1", cmd, &options).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("timed out waiting for shell"), "{}", message);
        assert!(message.contains("banner exchange"), "{}", message);
    }

    #[tokio::test]
    async fn stderr_after_ready_does_not_disturb_session() {
        let mut session = SshSession::spawn("localhost", local_shell(), &SshOptions::default())
            .await
            .unwrap();

        session.send("echo noise >&2; echo still-here").await.unwrap();
        let out = read_until(&mut session, "still-here").await;
        assert!(!out.contains("noise"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires ssh host"]
    async fn ssh_session_to_real_host() {
        let host = std::env::var("CLOUDTEST_SSH_HOST").expect("CLOUDTEST_SSH_HOST");
        let user = std::env::var("CLOUDTEST_SSH_USER").unwrap_or_else(|_| "root".into());
        let provider = SshSessionProvider::default();

        let mut session = provider.open(&host, &Credentials::new(&user)).await.unwrap();
        session.send("whoami").await.unwrap();

        let mut out = Vec::new();
        tokio::time::timeout(Duration::from_secs(10), async {
            while !String::from_utf8_lossy(&out).contains(&user) {
                out.extend(session.poll_read(Duration::from_millis(100)).await.unwrap());
            }
        })
        .await
        .expect("whoami output never arrived");
        session.close().await.unwrap();
    }
}
