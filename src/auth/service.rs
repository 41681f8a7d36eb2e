//! Account operations: sign-up, sign-in, verification, current user, sign-out
//!
//! Anonymous endpoints (sign-up, both sign-in flavours, verification) are
//! sent with [`PendingRequest::anonymous`] so a rejected password never
//! triggers a token refresh. Everything else goes through the dispatcher's
//! bearer/refresh path.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::credential_store::{Credential, CredentialStore, SessionState};
use crate::auth::refresh::TokenPair;
use crate::config::{EndpointsConfig, OAuthConfig};
use crate::error::{AuthlinkError, Result};
use crate::http::dispatcher::RequestDispatcher;
use crate::http::request::PendingRequest;

/// New account details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl SignUpRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    /// Checks the fields the server would reject outright.
    ///
    /// All failing fields are reported together, as the server does.
    pub fn validate(&self) -> Result<()> {
        let mut fields = BTreeMap::new();
        if self.email.trim().is_empty() {
            fields.insert(
                "email".to_string(),
                vec!["This field may not be blank.".to_string()],
            );
        } else if !is_valid_email(self.email.trim()) {
            fields.insert(
                "email".to_string(),
                vec!["Enter a valid email address.".to_string()],
            );
        }
        if self.password.is_empty() {
            fields.insert(
                "password".to_string(),
                vec!["This field may not be blank.".to_string()],
            );
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(AuthlinkError::Validation { fields })
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
        })
        .is_match(email)
}

/// Account as returned by the user endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: serde_json::Value,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_verified: Option<bool>,
    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// "First Last", falling back to the email address.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct GoogleSignInRequest<'a> {
    credential: &'a str,
    client_id: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    uid: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
struct SignOutRequest<'a> {
    refresh_token: &'a str,
}

/// Account operations bound to one session.
pub struct AuthService {
    dispatcher: Arc<RequestDispatcher>,
    endpoints: EndpointsConfig,
    oauth: OAuthConfig,
}

impl AuthService {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        endpoints: EndpointsConfig,
        oauth: OAuthConfig,
    ) -> Self {
        Self {
            dispatcher,
            endpoints,
            oauth,
        }
    }

    fn store(&self) -> &Arc<CredentialStore> {
        self.dispatcher.store()
    }

    /// Creates an account. The session is not changed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::Validation`] without a network call when the
    /// email or password is obviously invalid, or with the server's field
    /// messages when the server rejects the request.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<User> {
        request.validate()?;
        tracing::info!("Signing up");
        self.dispatcher
            .send_json(
                PendingRequest::post(&self.endpoints.signup)
                    .json(request)?
                    .anonymous(),
            )
            .await
    }

    /// Signs in with email and password and stores the returned tokens.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Credential> {
        let request = PendingRequest::post(&self.endpoints.signin)
            .json(&SignInRequest { email, password })?
            .anonymous();
        self.exchange_for_tokens(request).await
    }

    /// Signs in with a Google Identity Services credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::Config`] when no Google client id is
    /// configured.
    pub async fn sign_in_with_google(&self, credential: &str) -> Result<Credential> {
        let client_id = self.oauth.google_client_id.as_deref().ok_or_else(|| {
            AuthlinkError::Config(
                "Google sign-in requires oauth.google_client_id".to_string(),
            )
        })?;
        let request = PendingRequest::post(&self.endpoints.signin_google)
            .json(&GoogleSignInRequest {
                credential,
                client_id,
            })?
            .anonymous();
        self.exchange_for_tokens(request).await
    }

    async fn exchange_for_tokens(&self, request: PendingRequest) -> Result<Credential> {
        let store = self.store();
        store.set_state(SessionState::Authenticating);

        let result = async {
            let pair: TokenPair = self.dispatcher.send_json(request).await?;
            if pair.refresh_token.is_none() {
                tracing::warn!("Sign-in response carried no refresh token");
            }
            let credential = pair.into_credential(None);
            store.set(credential.clone())?;
            Ok::<_, AuthlinkError>(credential)
        }
        .await;

        match &result {
            Ok(_) => tracing::info!("Signed in"),
            Err(e) => {
                tracing::warn!("Sign-in failed: {}", e);
                store.settle();
            }
        }
        result
    }

    /// Confirms an account from the link in the verification email.
    pub async fn verify_account(&self, uid: &str, token: &str) -> Result<serde_json::Value> {
        let response = self
            .dispatcher
            .send(
                PendingRequest::post(&self.endpoints.verify_account)
                    .json(&VerifyRequest { uid, token })?
                    .anonymous(),
            )
            .await?;
        if response.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        response.json()
    }

    /// Fetches the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::NotAuthenticated`] without a network call
    /// when the session holds no token at all.
    pub async fn current_user(&self) -> Result<User> {
        if self.store().get().is_empty() {
            return Err(AuthlinkError::NotAuthenticated);
        }
        self.dispatcher.get_json(&self.endpoints.user).await
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<String> {
        let stale = self.store().access_token();
        self.dispatcher.refresher().refresh(stale.as_deref()).await
    }

    /// Signs out on the server and clears the local session.
    ///
    /// Without a stored refresh token there is nothing to revoke; the local
    /// session is cleared and no request is made. When the server call
    /// fails the error is returned and the session is kept. The clear waits
    /// for any refresh in flight, so a late refresh response cannot bring
    /// the session back.
    pub async fn sign_out(&self) -> Result<()> {
        let refresher = self.dispatcher.refresher();
        if self.store().refresh_token().is_none() {
            tracing::info!("No refresh token stored; clearing local session only");
            return refresher.clear_session_locked().await;
        }

        // Built per attempt: a refresh after a 401 may rotate the token.
        let signout = &self.endpoints.signout;
        self.dispatcher
            .send_with(|credential| {
                let refresh_token = credential
                    .refresh_token
                    .as_deref()
                    .ok_or(AuthlinkError::NotAuthenticated)?;
                PendingRequest::post(signout).json(&SignOutRequest { refresh_token })
            })
            .await?;

        refresher.clear_session_locked().await?;
        tracing::info!("Signed out");
        Ok(())
    }
}
