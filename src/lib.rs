//! Authlink - authenticated API client library
//!
//! This library keeps a signed-in session alive against a token-based API:
//! it stores the access/refresh token pair, attaches the bearer header to
//! every call, and on a `401` refreshes the access token once and retries
//! the rejected request exactly once.
//!
//! # Architecture
//!
//! - `auth`: credential store, durable storage backends, token refresh and
//!   account operations (sign-up, sign-in, verification, sign-out)
//! - `http`: request dispatch with the refresh-and-retry-once policy
//! - `shorts`: paginated short-video feed and a cursor over it
//! - `preferences`: persisted theme preference
//! - `client`: wiring of one session from configuration
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use authlink::{AuthlinkClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = AuthlinkClient::from_config(&config)?;
//!     client.auth().sign_in("a@b.com", "x").await?;
//!     let user = client.auth().current_user().await?;
//!     println!("signed in as {}", user.email);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod preferences;
pub mod shorts;

// Re-export commonly used types
pub use auth::credential_store::{Credential, CredentialStore, SessionState};
pub use client::AuthlinkClient;
pub use config::Config;
pub use error::{AuthlinkError, Result};
pub use http::request::{ApiResponse, PendingRequest};
