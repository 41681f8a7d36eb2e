//! Authenticated request dispatch with refresh-and-retry-once
//!
//! [`RequestDispatcher::send`] attaches `Authorization: Bearer <token>` from
//! the credential store, and on a `401` awaits
//! [`RefreshCoordinator::refresh`] before re-sending the same
//! [`PendingRequest`] exactly once with the token the refresh returned.
//!
//! | First response | Outcome |
//! |----------------|---------|
//! | 2xx | `Ok(ApiResponse)` |
//! | non-401 failure | classified error, no retry |
//! | 401, anonymous request | classified error, no retry |
//! | 401, refresh fails | `RefreshFailed`, store cleared |
//! | 401, refresh succeeds | one retry; its outcome is final |

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::credential_store::{Credential, CredentialStore};
use crate::auth::refresh::RefreshCoordinator;
use crate::config::ApiConfig;
use crate::error::{AuthlinkError, Result};
use crate::http::request::{classify, endpoint_url, ApiResponse, PendingRequest};

/// Builds the shared HTTP client from the API configuration.
///
/// # Errors
///
/// Returns [`AuthlinkError::Config`] if the client cannot be constructed.
pub fn build_http_client(config: &ApiConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("authlink/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AuthlinkError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Issues API calls on behalf of the current session.
pub struct RequestDispatcher {
    http: Client,
    base_url: Url,
    store: Arc<CredentialStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl RequestDispatcher {
    pub fn new(
        http: Client,
        base_url: Url,
        store: Arc<CredentialStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            http,
            base_url,
            store,
            refresher,
        }
    }

    /// The session this dispatcher reads tokens from.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// The coordinator used on `401`.
    pub fn refresher(&self) -> &Arc<RefreshCoordinator> {
        &self.refresher
    }

    /// Resolves an endpoint path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        endpoint_url(&self.base_url, path)
    }

    /// Sends `request`, refreshing and retrying once on `401`.
    ///
    /// # Errors
    ///
    /// - [`AuthlinkError::Network`] on transport failure (never retried).
    /// - [`AuthlinkError::Validation`] / [`AuthlinkError::Http`] for
    ///   non-success responses, including a `401` on the retry.
    /// - [`AuthlinkError::RefreshFailed`] when the refresh after a `401`
    ///   fails; the session is cleared.
    pub async fn send(&self, request: PendingRequest) -> Result<ApiResponse> {
        self.send_with(move |_| Ok(request.clone())).await
    }

    /// Like [`send`](Self::send), but builds the request from the current
    /// credential, once for the first attempt and again for the retry.
    ///
    /// Use it when the body carries a token, so the retry after a refresh
    /// sends the rotated one.
    pub async fn send_with<F>(&self, build: F) -> Result<ApiResponse>
    where
        F: Fn(&Credential) -> Result<PendingRequest>,
    {
        let credential = self.store.get();
        let request = build(&credential)?;
        let token = if request.authenticated {
            credential.access_token
        } else {
            None
        };

        let (status, body) = self.transmit(&request, token.as_deref()).await?;
        if status != StatusCode::UNAUTHORIZED || !request.authenticated {
            return finish(status, body);
        }

        tracing::warn!(
            "{} {} returned 401; refreshing access token",
            request.method,
            request.path
        );
        let fresh = self.refresher.refresh(token.as_deref()).await?;

        let retry = build(&self.store.get())?;
        tracing::debug!("Retrying {} {} with refreshed token", retry.method, retry.path);
        let (status, body) = self.transmit(&retry, Some(&fresh)).await?;
        finish(status, body)
    }

    /// Sends `request` and decodes a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T> {
        self.send(request).await?.json()
    }

    /// `GET path` with the session token.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(PendingRequest::get(path)).await
    }

    /// `POST path` with a JSON body and the session token.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(PendingRequest::post(path).json(body)?).await
    }

    async fn transmit(
        &self,
        request: &PendingRequest,
        token: Option<&str>,
    ) -> Result<(StatusCode, String)> {
        let url = self.url(&request.path)?;
        tracing::debug!(
            "Dispatching {} {} (bearer: {})",
            request.method,
            url,
            token.is_some()
        );

        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("{} {} failed: {}", request.method, request.path, e);
            AuthlinkError::Network(e)
        })?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

fn finish(status: StatusCode, body: String) -> Result<ApiResponse> {
    if status.is_success() {
        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(classify(status.as_u16(), &body))
    }
}
