//! Wiring of one session: storage, credential store, refresh, dispatch
//!
//! [`AuthlinkClient`] is the explicit session context. Build one per
//! signed-in identity and hand its parts to whatever issues requests.

use std::sync::Arc;

use url::Url;

use crate::auth::credential_store::CredentialStore;
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::service::AuthService;
use crate::auth::storage::{self, DurableStorage};
use crate::config::Config;
use crate::error::{AuthlinkError, Result};
use crate::http::dispatcher::{build_http_client, RequestDispatcher};
use crate::preferences::Preferences;
use crate::shorts::{ShortsClient, ShortsFeed};

/// Everything needed to talk to the API as one session.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authlink::auth::storage::MemoryStorage;
/// use authlink::client::AuthlinkClient;
/// use authlink::config::Config;
///
/// let client = AuthlinkClient::with_storage(&Config::default(), Arc::new(MemoryStorage::default())).unwrap();
/// assert!(client.store().get().is_empty());
/// ```
pub struct AuthlinkClient {
    store: Arc<CredentialStore>,
    dispatcher: Arc<RequestDispatcher>,
    auth: AuthService,
    shorts: ShortsClient,
    preferences: Preferences,
    prefetch_threshold: usize,
}

impl AuthlinkClient {
    /// Builds a client using the storage backend named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = storage::from_config(&config.storage)?;
        Self::with_storage(config, storage)
    }

    /// Builds a client on top of an existing storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::Config`] for an unusable base URL and any
    /// storage error raised while loading stored tokens.
    pub fn with_storage(config: &Config, storage: Arc<dyn DurableStorage>) -> Result<Self> {
        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            AuthlinkError::Config(format!("Invalid api.base_url {}: {}", config.api.base_url, e))
        })?;
        let http = build_http_client(&config.api)?;

        let store = Arc::new(CredentialStore::load(Arc::clone(&storage))?);
        let refresh_url =
            crate::http::request::endpoint_url(&base_url, &config.api.endpoints.refresh)?;
        let refresher = Arc::new(RefreshCoordinator::new(
            http.clone(),
            refresh_url,
            Arc::clone(&store),
        ));
        let dispatcher = Arc::new(RequestDispatcher::new(
            http,
            base_url,
            Arc::clone(&store),
            refresher,
        ));

        Ok(Self {
            auth: AuthService::new(
                Arc::clone(&dispatcher),
                config.api.endpoints.clone(),
                config.oauth.clone(),
            ),
            shorts: ShortsClient::new(Arc::clone(&dispatcher), config.api.endpoints.shorts.clone()),
            preferences: Preferences::new(storage),
            prefetch_threshold: config.shorts.prefetch_threshold,
            store,
            dispatcher,
        })
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.dispatcher
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn shorts(&self) -> &ShortsClient {
        &self.shorts
    }

    /// A fresh cursor over the shorts feed.
    pub fn shorts_feed(&self) -> ShortsFeed {
        ShortsFeed::new(self.shorts.clone(), self.prefetch_threshold)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }
}
