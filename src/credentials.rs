//! Credential store
//!
//! Holds the bearer secrets accepted by the relay and the Gemini session
//! cookies. Built once at startup and never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;

/// Opaque secret that never prints its value
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exact comparison against a presented credential
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short SHA-256 fingerprint, safe to log
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())[..12].to_string()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(sha256:{})", self.fingerprint())
    }
}

/// Whether bearer authentication is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No secret configured; every request is allowed
    Open,
    /// At least one secret configured
    Secured,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Open => write!(f, "open"),
            AuthMode::Secured => write!(f, "secured"),
        }
    }
}

/// Process-wide credentials
#[derive(Debug, Clone)]
pub struct CredentialStore {
    pub custom_key: Option<Secret>,
    pub platform_token: Option<Secret>,
    pub cookie_primary: Secret,
    pub cookie_secondary: Secret,
}

impl CredentialStore {
    pub fn new(
        custom_key: Option<String>,
        platform_token: Option<String>,
        cookie_primary: impl Into<String>,
        cookie_secondary: impl Into<String>,
    ) -> Self {
        Self {
            custom_key: custom_key.filter(|k| !k.is_empty()).map(Secret::new),
            platform_token: platform_token.filter(|t| !t.is_empty()).map(Secret::new),
            cookie_primary: Secret::new(cookie_primary),
            cookie_secondary: Secret::new(cookie_secondary),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key.clone(),
            config.hf_token.clone(),
            config.secure_1psid.clone(),
            config.secure_1psidts.clone(),
        )
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.custom_key.is_none() && self.platform_token.is_none() {
            AuthMode::Open
        } else {
            AuthMode::Secured
        }
    }

    pub fn is_open_mode(&self) -> bool {
        self.auth_mode() == AuthMode::Open
    }

    /// At least one session cookie is available to reach the backend
    pub fn has_session_cookies(&self) -> bool {
        !self.cookie_primary.is_empty() || !self.cookie_secondary.is_empty()
    }
}
