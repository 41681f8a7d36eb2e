//! Access token refresh
//!
//! [`RefreshCoordinator::refresh`] exchanges the stored refresh token for a
//! new access token and returns it to the awaiting caller. Callers are
//! serialized on an async mutex so that concurrent 401s share a single
//! refresh: whoever acquires the lock second sees that the stored token no
//! longer matches the stale one it was rejected with and reuses it.
//!
//! A failed refresh is terminal for the session. The credential store is
//! cleared and the caller must sign in again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::auth::credential_store::{Credential, CredentialStore, SessionState};
use crate::error::{AuthlinkError, Result};

/// Token endpoint response.
///
/// simplejwt-style backends answer with `access`/`refresh`; both spellings
/// are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "access")]
    pub access_token: String,

    /// Present on sign-in, and on refresh when the backend rotates tokens.
    #[serde(default, alias = "refresh", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// Converts into a credential, keeping `fallback_refresh` when the
    /// response did not rotate the refresh token.
    pub fn into_credential(self, fallback_refresh: Option<String>) -> Credential {
        Credential {
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token.or(fallback_refresh),
        }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Obtains new access tokens and writes them to the credential store.
pub struct RefreshCoordinator {
    http: reqwest::Client,
    endpoint: Url,
    store: Arc<CredentialStore>,
    in_flight: Mutex<()>,
}

impl RefreshCoordinator {
    /// Creates a coordinator posting to `endpoint`.
    ///
    /// `http` must be a plain client: the refresh call never goes through
    /// the dispatcher, so it cannot recurse into another refresh.
    pub fn new(http: reqwest::Client, endpoint: Url, store: Arc<CredentialStore>) -> Self {
        Self {
            http,
            endpoint,
            store,
            in_flight: Mutex::new(()),
        }
    }

    /// Returns a fresh access token.
    ///
    /// `stale` is the access token the caller was rejected with (or `None`
    /// if it sent none). When the store already holds a different access
    /// token, another caller refreshed in the meantime and that token is
    /// returned without a network call.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::RefreshFailed`] when there is no refresh
    /// token or the refresh call fails for any reason. The credential store
    /// has been cleared by then. If the session was cleared or replaced
    /// while the call was in flight, the new token is dropped, the newer
    /// session is left as it is, and `RefreshFailed` is returned as well.
    pub async fn refresh(&self, stale: Option<&str>) -> Result<String> {
        let _guard = self.in_flight.lock().await;

        let generation = self.store.generation();
        let current = self.store.get();
        if let Some(access) = current.access_token.as_deref() {
            if Some(access) != stale {
                tracing::debug!("Access token already refreshed by a concurrent request");
                return Ok(access.to_string());
            }
        }

        let Some(refresh_token) = current.refresh_token else {
            tracing::warn!("No refresh token available; clearing session");
            self.clear_session(generation);
            return Err(AuthlinkError::RefreshFailed(
                "no refresh token stored".to_string(),
            ));
        };

        self.store.set_state(SessionState::Refreshing);

        match self.request_new_token(&refresh_token).await {
            Ok(pair) => {
                let credential = pair.into_credential(Some(refresh_token));
                let access = credential.access_token.clone().unwrap_or_default();
                match self.store.set_if_generation(credential, generation) {
                    Ok(true) => {
                        tracing::info!("Access token refreshed");
                        Ok(access)
                    }
                    Ok(false) => {
                        tracing::info!("Session changed during refresh; discarding new token");
                        self.store.settle();
                        Err(AuthlinkError::RefreshFailed(
                            "session ended while refreshing".to_string(),
                        ))
                    }
                    Err(e) => {
                        tracing::warn!("Failed to persist refreshed token: {}", e);
                        self.clear_session(generation);
                        Err(AuthlinkError::RefreshFailed(format!(
                            "could not persist refreshed token: {e}"
                        )))
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}; clearing session", e);
                self.clear_session(generation);
                Err(AuthlinkError::RefreshFailed(e.to_string()))
            }
        }
    }

    /// Clears the session once no refresh is in flight.
    ///
    /// A refresh that completes while this waits has its token wiped; one
    /// that starts afterwards finds no refresh token.
    pub async fn clear_session_locked(&self) -> Result<()> {
        let _guard = self.in_flight.lock().await;
        self.store.clear()
    }

    async fn request_new_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(crate::http::request::classify(status.as_u16(), &body));
        }

        let pair: TokenPair = serde_json::from_str(&body)?;
        if pair.access_token.is_empty() {
            return Err(AuthlinkError::RefreshFailed(
                "refresh response carried an empty access token".to_string(),
            ));
        }
        Ok(pair)
    }

    fn clear_session(&self, generation: u64) {
        match self.store.clear_if_generation(generation) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Session changed during refresh; leaving it in place");
                self.store.settle();
            }
            Err(e) => tracing::warn!("Failed to clear stored credentials: {}", e),
        }
    }
}
