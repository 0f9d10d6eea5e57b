//! Login material for remote sessions.

use serde::Deserialize;
use std::path::PathBuf;

/// Credentials handed to a session provider when opening a session.
///
/// Either a password or a private key may be set. With neither, the
/// provider relies on its ambient agent/keys.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Remote login user (default: `root`).
    #[serde(default = "default_username")]
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// Path to a private key file.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

fn default_username() -> String {
    "root".to_string()
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: None,
            key_path: None,
        }
    }
}

impl Credentials {
    /// Credentials for `username` using ambient keys.
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            password: None,
            key_path: None,
        }
    }

    /// Set a login password.
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Set a private key path.
    pub fn with_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("key_path", &self.key_path)
            .finish()
    }
}
