//! Configuration file parser for ~/.config/storefront/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use crate::session::Session;
use crate::util::{validate_base_url, BaseUrlError};
use crate::wishlist::{ControllerOptions, DEFAULT_CATALOG_CONCURRENCY, DEFAULT_FEEDBACK_TTL_MS};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the bearer token; overrides `auth_token`.
pub const TOKEN_ENV: &str = "STOREFRONT_TOKEN";
/// Environment variable holding the user id; overrides `user_id`.
pub const USER_ID_ENV: &str = "STOREFRONT_USER_ID";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid api_base_url: {0}")]
    InvalidBaseUrl(#[from] BaseUrlError),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The Debug impl masks `auth_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the storefront REST API.
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long success messages and transient errors stay visible.
    pub feedback_ttl_ms: u64,

    /// Catalog lookups in flight while reconciling.
    pub catalog_concurrency: usize,

    /// Bearer token (alternative to STOREFRONT_TOKEN env var).
    pub auth_token: Option<String>,

    /// User id sent with cart requests (alternative to STOREFRONT_USER_ID).
    pub user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 20,
            feedback_ttl_ms: DEFAULT_FEEDBACK_TTL_MS,
            catalog_concurrency: DEFAULT_CATALOG_CONCURRENCY,
            auth_token: None,
            user_id: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("feedback_ttl_ms", &self.feedback_ttl_ms)
            .field("catalog_concurrency", &self.catalog_concurrency)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "api_base_url",
        "request_timeout_secs",
        "feedback_ttl_ms",
        "catalog_concurrency",
        "auth_token",
        "user_id",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Insecure `api_base_url` → `Err(ConfigError::InvalidBaseUrl)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse TOML text and validate it.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        validate_base_url(&config.api_base_url)?;
        tracing::info!(api_base_url = %config.api_base_url, "Loaded configuration");
        Ok(config)
    }

    /// Build the session, preferring environment variables over the file.
    pub fn session(&self) -> Session {
        self.session_with(|name| std::env::var(name).ok())
    }

    fn session_with(&self, env: impl Fn(&str) -> Option<String>) -> Session {
        let token = env(TOKEN_ENV).or_else(|| self.auth_token.clone());
        let user_id = env(USER_ID_ENV).or_else(|| self.user_id.clone());
        Session::from_parts(token, user_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            feedback_ttl: Duration::from_millis(self.feedback_ttl_ms),
            catalog_concurrency: self.catalog_concurrency.max(1),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
