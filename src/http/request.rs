//! Outbound request description, response wrapper and error classification

use std::collections::BTreeMap;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{AuthlinkError, Result};

/// An outbound API call, independent of any token.
///
/// The bearer header is attached at send time, so the same request can be
/// re-sent after a refresh with the new token.
///
/// # Examples
///
/// ```
/// use authlink::http::request::PendingRequest;
///
/// let request = PendingRequest::post("/api/v1/auth/signin/token/")
///     .json(&serde_json::json!({"email": "a@b.com", "password": "x"}))
///     .unwrap()
///     .anonymous();
/// assert!(!request.authenticated);
/// ```
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// Path relative to the configured base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Attach the bearer token and take part in refresh-and-retry.
    pub authenticated: bool,
}

impl PendingRequest {
    /// Creates an authenticated request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::Serialization`] if `body` cannot be encoded.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Marks the request as anonymous: no bearer header, no refresh on 401.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// A successful (2xx) API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AuthlinkError::Serialization`] for a body that does not
    /// match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Resolves `path` against `base`, keeping any path prefix on `base`.
///
/// # Examples
///
/// ```
/// use authlink::http::request::endpoint_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/backend").unwrap();
/// let url = endpoint_url(&base, "/api/v1/auth/user/").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/backend/api/v1/auth/user/");
/// ```
pub fn endpoint_url(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Turns a non-success response into the matching [`AuthlinkError`].
///
/// A `4xx` other than `401` whose body is a JSON object of strings or
/// string arrays becomes [`AuthlinkError::Validation`]. Outside `400`, a
/// body holding nothing but `detail` (a DRF `404`/`403` message) is not a
/// field error. Everything else is [`AuthlinkError::Http`] with the raw
/// body.
pub fn classify(status: u16, body: &str) -> AuthlinkError {
    if (400..500).contains(&status) && status != 401 {
        if let Some(fields) = parse_field_errors(body) {
            let detail_only = fields.keys().all(|field| field == "detail");
            if status == 400 || !detail_only {
                return AuthlinkError::Validation { fields };
            }
        }
    }
    AuthlinkError::Http {
        status,
        body: body.to_string(),
    }
}

fn parse_field_errors(body: &str) -> Option<BTreeMap<String, Vec<String>>> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    if object.is_empty() {
        return None;
    }

    let mut fields = BTreeMap::new();
    for (field, messages) in object {
        let messages = match messages {
            serde_json::Value::String(message) => vec![message.clone()],
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?,
            _ => return None,
        };
        fields.insert(field.clone(), messages);
    }
    Some(fields)
}
