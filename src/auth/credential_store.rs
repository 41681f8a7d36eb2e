//! Session credentials and their reactive in-memory mirror
//!
//! [`CredentialStore`] is the single owner of the current [`Credential`].
//! Every write goes to [`DurableStorage`] first and is then published on a
//! `tokio::sync::watch` channel as a [`SessionSnapshot`], so UI-style
//! consumers can react to sign-in, refresh and sign-out without polling.
//!
//! The store is an explicit context object: share it with `Arc` between
//! the dispatcher, the refresh coordinator and the auth service.

use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::auth::storage::{DurableStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// The access/refresh token pair of the current session.
///
/// Either token may be absent: both are absent before sign-in and after
/// sign-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived token sent as `Authorization: Bearer <token>`.
    pub access_token: Option<String>,

    /// Longer-lived token exchanged for a new access token.
    pub refresh_token: Option<String>,
}

impl Credential {
    /// Builds a credential holding both tokens.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Returns `true` when neither token is present.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Expiry of the access token, read from its JWT `exp` claim.
    ///
    /// Returns `None` when there is no access token or it is not a JWT
    /// carrying `exp`. The signature is not checked; the value is only
    /// informational and never used to decide when to refresh.
    ///
    /// # Examples
    ///
    /// ```
    /// use authlink::auth::credential_store::Credential;
    ///
    /// // {"alg":"none"}.{"exp":1800000000}.
    /// let jwt = "eyJhbGciOiJub25lIn0.eyJleHAiOjE4MDAwMDAwMDB9.";
    /// let credential = Credential::new(jwt, "R1");
    /// assert_eq!(credential.access_expires_at().unwrap().timestamp(), 1_800_000_000);
    ///
    /// assert!(Credential::new("opaque", "R1").access_expires_at().is_none());
    /// ```
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        let token = self.access_token.as_deref()?;
        let payload = token.split('.').nth(1)?;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        DateTime::from_timestamp(claims.get("exp")?.as_i64()?, 0)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of a session.
///
/// `Unauthenticated -> Authenticating -> Authenticated -> [Refreshing] ->
/// Authenticated | Unauthenticated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No usable credential.
    Unauthenticated,
    /// A sign-in request is in flight.
    Authenticating,
    /// An access token is available.
    Authenticated,
    /// A 401 was received and a refresh is in flight.
    Refreshing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        };
        f.write_str(name)
    }
}

/// What reactive consumers observe: the credential plus the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub credential: Credential,
    pub state: SessionState,
}

impl SessionSnapshot {
    fn settled(credential: Credential) -> Self {
        let state = if credential.access_token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };
        Self { credential, state }
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Owner of the session credential.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authlink::auth::credential_store::{Credential, CredentialStore, SessionState};
/// use authlink::auth::storage::MemoryStorage;
///
/// let store = CredentialStore::load(Arc::new(MemoryStorage::default())).unwrap();
/// assert_eq!(store.state(), SessionState::Unauthenticated);
///
/// store.set(Credential::new("T1", "R1")).unwrap();
/// assert_eq!(store.access_token().as_deref(), Some("T1"));
/// assert_eq!(store.state(), SessionState::Authenticated);
///
/// store.clear().unwrap();
/// assert!(store.get().is_empty());
/// ```
pub struct CredentialStore {
    storage: Arc<dyn DurableStorage>,
    snapshot: watch::Sender<SessionSnapshot>,
    generation: Mutex<u64>,
}

impl CredentialStore {
    /// Rebuilds the in-memory credential from durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error when the storage backend cannot be read.
    pub fn load(storage: Arc<dyn DurableStorage>) -> Result<Self> {
        let credential = Credential {
            access_token: storage.get(ACCESS_TOKEN_KEY)?,
            refresh_token: storage.get(REFRESH_TOKEN_KEY)?,
        };
        let (snapshot, _) = watch::channel(SessionSnapshot::settled(credential));
        Ok(Self {
            storage,
            snapshot,
            generation: Mutex::new(0),
        })
    }

    /// Current credential.
    pub fn get(&self) -> Credential {
        self.snapshot.borrow().credential.clone()
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.snapshot.borrow().credential.access_token.clone()
    }

    /// Current refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.snapshot.borrow().credential.refresh_token.clone()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    /// Session generation, bumped by every successful write and by
    /// every clear.
    ///
    /// Read it before a slow operation and hand it back to
    /// [`set_if_generation`](Self::set_if_generation) or
    /// [`clear_if_generation`](Self::clear_if_generation) so the result is
    /// dropped when a sign-out or a new sign-in happened meanwhile.
    pub fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    /// Replaces the credential, durable storage first.
    ///
    /// Absent fields are removed from storage. The state settles to
    /// `Authenticated` or `Unauthenticated` depending on the access token.
    ///
    /// # Errors
    ///
    /// Returns an error when the storage backend rejects the write. The
    /// in-memory credential is left unchanged and the stored access token
    /// is rolled back, so storage never holds a mixed pair.
    pub fn set(&self, credential: Credential) -> Result<()> {
        let mut generation = self.lock_generation();
        self.write(credential)?;
        *generation += 1;
        Ok(())
    }

    /// [`set`](Self::set), unless the generation moved past `expected`.
    ///
    /// Returns `Ok(false)` when the write was dropped.
    pub fn set_if_generation(&self, credential: Credential, expected: u64) -> Result<bool> {
        let mut generation = self.lock_generation();
        if *generation != expected {
            return Ok(false);
        }
        self.write(credential)?;
        *generation += 1;
        Ok(true)
    }

    /// Removes both tokens and returns to `Unauthenticated`.
    ///
    /// The in-memory credential is cleared even when storage fails, so a
    /// failed refresh never leaves a usable token behind.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn clear(&self) -> Result<()> {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.erase()
    }

    /// [`clear`](Self::clear), unless the generation moved past `expected`.
    ///
    /// Returns `Ok(false)` when nothing was cleared.
    pub fn clear_if_generation(&self, expected: u64) -> Result<bool> {
        let mut generation = self.lock_generation();
        if *generation != expected {
            return Ok(false);
        }
        *generation += 1;
        self.erase()?;
        Ok(true)
    }

    /// Moves the session into a transitional state without touching tokens.
    pub fn set_state(&self, state: SessionState) {
        self.snapshot.send_modify(|snapshot| snapshot.state = state);
    }

    /// Returns the state implied by the stored credential.
    ///
    /// Used to leave `Authenticating` after a failed sign-in.
    pub fn settle(&self) {
        self.snapshot.send_modify(|snapshot| {
            *snapshot = SessionSnapshot::settled(snapshot.credential.clone());
        });
    }

    /// Subscribes to credential and state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    fn write(&self, credential: Credential) -> Result<()> {
        let previous_access = self.storage.get(ACCESS_TOKEN_KEY)?;
        self.persist(ACCESS_TOKEN_KEY, credential.access_token.as_deref())?;
        if let Err(e) = self.persist(REFRESH_TOKEN_KEY, credential.refresh_token.as_deref()) {
            if let Err(rollback) = self.persist(ACCESS_TOKEN_KEY, previous_access.as_deref()) {
                tracing::warn!("Failed to roll back stored access token: {}", rollback);
            }
            return Err(e);
        }
        self.snapshot
            .send_replace(SessionSnapshot::settled(credential));
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        let access = self.storage.remove(ACCESS_TOKEN_KEY);
        let refresh = self.storage.remove(REFRESH_TOKEN_KEY);
        self.snapshot
            .send_replace(SessionSnapshot::settled(Credential::default()));
        access.and(refresh)
    }

    fn persist(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        }
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }
}
