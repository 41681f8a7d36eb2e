//! Configuration management for Authlink
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{AuthlinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Authlink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// OAuth provider settings
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Durable credential storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Shorts feed settings
    #[serde(default)]
    pub shorts: ShortsConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds); the only bound on a hung call
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Endpoint paths relative to `base_url`
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

/// Endpoint paths consumed by the client
///
/// Backends in the wild disagree slightly on these paths, so each one can
/// be overridden from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_signup")]
    pub signup: String,
    #[serde(default = "default_signin")]
    pub signin: String,
    #[serde(default = "default_signin_google")]
    pub signin_google: String,
    #[serde(default = "default_refresh")]
    pub refresh: String,
    #[serde(default = "default_signout")]
    pub signout: String,
    #[serde(default = "default_verify_account")]
    pub verify_account: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_shorts")]
    pub shorts: String,
}

fn default_signup() -> String {
    "/api/v1/auth/signup/".to_string()
}

fn default_signin() -> String {
    "/api/v1/auth/signin/token/".to_string()
}

fn default_signin_google() -> String {
    "/api/v1/auth/signin/google/".to_string()
}

fn default_refresh() -> String {
    "/api/v1/auth/signin/token/refresh/".to_string()
}

fn default_signout() -> String {
    "/api/v1/auth/signout/".to_string()
}

fn default_verify_account() -> String {
    "/api/v1/auth/verify-user-account/confirm/".to_string()
}

fn default_user() -> String {
    "/api/v1/auth/user/".to_string()
}

fn default_shorts() -> String {
    "/api/v1/shorts/".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            signup: default_signup(),
            signin: default_signin(),
            signin_google: default_signin_google(),
            refresh: default_refresh(),
            signout: default_signout(),
            verify_account: default_verify_account(),
            user: default_user(),
            shorts: default_shorts(),
        }
    }
}

impl EndpointsConfig {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("signup", self.signup.as_str()),
            ("signin", self.signin.as_str()),
            ("signin_google", self.signin_google.as_str()),
            ("refresh", self.refresh.as_str()),
            ("signout", self.signout.as_str()),
            ("verify_account", self.verify_account.as_str()),
            ("user", self.user.as_str()),
            ("shorts", self.shorts.as_str()),
        ]
        .into_iter()
    }
}

/// OAuth provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Google OAuth client id; Google sign-in is disabled when unset
    #[serde(default)]
    pub google_client_id: Option<String>,
}

/// Durable credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend: "file", "keyring" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Path of the JSON file used by the "file" backend
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Service name used by the "keyring" backend
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_storage_backend() -> String {
    "file".to_string()
}

fn default_keyring_service() -> String {
    "authlink".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
            keyring_service: default_keyring_service(),
        }
    }
}

impl StorageConfig {
    /// Resolves the credential file path, falling back to the platform data dir.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("", "", "authlink")
            .map(|dirs| dirs.data_dir().join("credentials.json"))
            .ok_or_else(|| {
                AuthlinkError::Config(
                    "Unable to determine a data directory; set storage.path".to_string(),
                )
            })
    }
}

/// Shorts feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortsConfig {
    /// Fetch the next page once the cursor is this close to the loaded end
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: usize,
}

fn default_prefetch_threshold() -> usize {
    2
}

impl Default for ShortsConfig {
    fn default() -> Self {
        Self {
            prefetch_threshold: default_prefetch_threshold(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthlinkError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AuthlinkError::Config(format!("Failed to parse config: {}", e)))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("AUTHLINK_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("AUTHLINK_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid AUTHLINK_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(client_id) = std::env::var("AUTHLINK_GOOGLE_CLIENT_ID") {
            if !client_id.is_empty() {
                self.oauth.google_client_id = Some(client_id);
            }
        }

        if let Ok(backend) = std::env::var("AUTHLINK_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }

        if let Ok(path) = std::env::var("AUTHLINK_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.api_base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(backend) = &cli.storage_backend {
            self.storage.backend = backend.clone();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            AuthlinkError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(AuthlinkError::Config(format!(
                "api.base_url must use http or https, got {}",
                base.scheme()
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(AuthlinkError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.api.timeout_seconds > 600 {
            return Err(AuthlinkError::Config(
                "api.timeout_seconds must be less than or equal to 600".to_string(),
            ));
        }

        let valid_backends = ["file", "keyring", "memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(AuthlinkError::Config(format!(
                "Invalid storage backend: {}. Must be one of: {}",
                self.storage.backend,
                valid_backends.join(", ")
            )));
        }

        for (name, path) in self.api.endpoints.iter() {
            if path.trim().is_empty() {
                return Err(AuthlinkError::Config(format!(
                    "api.endpoints.{} cannot be empty",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            oauth: OAuthConfig::default(),
            storage: StorageConfig::default(),
            shorts: ShortsConfig::default(),
        }
    }
}
