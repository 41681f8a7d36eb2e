//! Error types for Authlink
//!
//! Every failure the library can surface is a variant of [`AuthlinkError`].
//! HTTP failures are classified exactly once, at the network boundary (see
//! [`crate::http::request::classify`]), so callers match on a tagged union
//! instead of poking at response shapes.

use std::collections::BTreeMap;

use thiserror::Error;

/// Main error type for Authlink operations
#[derive(Error, Debug)]
pub enum AuthlinkError {
    /// Transport-level failure: DNS, connect, TLS, timeout, body read
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP response that is not a field validation failure
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Field-level validation failure, keyed by field name
    #[error("Validation failed: {}", format_fields(.fields))]
    Validation {
        /// Messages per field (`detail` / `non_field_errors` for global ones)
        fields: BTreeMap<String, Vec<String>>,
    },

    /// Token refresh failed; the session has been cleared
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Operation needs a signed-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable credential storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// URL construction errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthlinkError {
    /// Builds a validation error for a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.to_string(), vec![message.into()]);
        AuthlinkError::Validation { fields }
    }

    /// Returns `true` when the caller should be sent back to sign-in.
    ///
    /// # Examples
    ///
    /// ```
    /// use authlink::error::AuthlinkError;
    ///
    /// assert!(AuthlinkError::NotAuthenticated.is_auth_failure());
    /// assert!(AuthlinkError::Http { status: 401, body: String::new() }.is_auth_failure());
    /// assert!(!AuthlinkError::Http { status: 500, body: String::new() }.is_auth_failure());
    /// ```
    pub fn is_auth_failure(&self) -> bool {
        match self {
            AuthlinkError::RefreshFailed(_) | AuthlinkError::NotAuthenticated => true,
            AuthlinkError::Http { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    ///
    /// Validation failures carry only their fields; they may come from a
    /// `4xx` response or from local checks.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthlinkError::Http { status, .. } => Some(*status),
            AuthlinkError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn format_fields(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for Authlink library operations
pub type Result<T> = std::result::Result<T, AuthlinkError>;
