/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `session` — Sign-up, sign-in, verification, refresh, sign-out, status
- `shorts`  — Shorts feed listing
- `theme`   — Theme preference

Handlers build an [`AuthlinkClient`](crate::client::AuthlinkClient) from the
loaded configuration and print results; the library does the work.
*/

use colored::Colorize;

use crate::error::AuthlinkError;

pub mod session;
pub mod shorts;
pub mod theme;

/// Adds a user-facing hint to errors that mean "sign in again".
pub(crate) fn explain(error: AuthlinkError) -> anyhow::Error {
    if error.is_auth_failure() {
        eprintln!(
            "{} run {} to start a new session.",
            "Session expired or missing:".yellow(),
            "authlink sign-in".cyan()
        );
    }
    if let AuthlinkError::Validation { fields } = &error {
        for (field, messages) in fields {
            eprintln!("  {}: {}", field.bold(), messages.join(" "));
        }
    }
    error.into()
}
