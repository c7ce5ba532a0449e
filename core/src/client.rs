//! Request building, response parsing and the authenticated round-trip.
//!
//! # Design
//! `ApiClient` is the single choke point for backend traffic. A call is
//! split into three steps:
//! - `build_request` composes the URL, merges headers and attaches the
//!   bearer token unless the caller opted out with `skip_auth`;
//! - the injected `Transport` performs the round-trip;
//! - `parse_response` / `parse_bytes` normalize non-2xx answers into
//!   `ApiError` and decode the body.
//!
//! Building and parsing are pure, so the same logic is exercised by unit
//! tests without a network. Nothing is retried.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, BASE_URL_VAR};
use crate::error::{ApiError, FieldErrors};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::store::{KeyValueStore, TOKEN_KEY};
use crate::types::{
    ProfileUpdate, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse, User,
};

const JSON: &str = "application/json";

/// Per-call options merged into the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
    /// Send no `Authorization` header even when a token is stored.
    pub skip_auth: bool,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            skip_auth: false,
        }
    }

    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    pub fn delete() -> Self {
        Self::new(HttpMethod::Delete)
    }

    /// Options carrying `payload` encoded as JSON.
    pub fn json<B: Serialize + ?Sized>(method: HttpMethod, payload: &B) -> Result<Self, ApiError> {
        let body =
            serde_json::to_vec(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(Self {
            body: Some(body),
            ..Self::new(method)
        })
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Replace-or-append, keeping header names unique regardless of case.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Pulls the single named field out of a response envelope such as
/// `{"user": {...}}`.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(
    mut envelope: Value,
    field: &str,
) -> Result<T, ApiError> {
    let value = envelope
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| ApiError::Deserialization(format!("missing `{field}` in response")))?;
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<FieldErrors>,
}

/// Client for the feedback backend.
///
/// Generic over the transport performing the I/O and the store holding the
/// bearer token, both supplied by the caller.
#[derive(Debug, Clone)]
pub struct ApiClient<T, S> {
    config: ClientConfig,
    transport: T,
    store: S,
}

impl<T: Transport, S: KeyValueStore> ApiClient<T, S> {
    pub fn new(config: ClientConfig, transport: T, store: S) -> Self {
        Self {
            config,
            transport,
            store,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Token management
    // -----------------------------------------------------------------------

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    pub fn set_token(&self, token: &str) -> Result<(), ApiError> {
        self.store.set(TOKEN_KEY, token)?;
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), ApiError> {
        self.store.remove(TOKEN_KEY)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    pub fn build_request(&self, path: &str, options: &RequestOptions) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), JSON.to_string())];
        if options.body.is_some() {
            headers.push(("content-type".to_string(), JSON.to_string()));
        }
        for (name, value) in &options.headers {
            set_header(&mut headers, name, value);
        }
        if !options.skip_auth {
            if let Some(token) = self.token() {
                set_header(&mut headers, "authorization", &format!("Bearer {token}"));
            }
        }

        HttpRequest {
            method: options.method,
            url: self.config.url_for(path),
            headers,
            body: options.body.clone(),
        }
    }

    /// Decodes a response body, or turns a failure status into `ApiError`.
    ///
    /// An empty 2xx body decodes as JSON `null`, which suits `()` and
    /// `Option<_>` targets.
    pub fn parse_response<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R, ApiError> {
        if !response.is_success() {
            return Err(self.error_from(&response));
        }
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(Value::Null)
                .map_err(|e| ApiError::Deserialization(e.to_string()));
        }
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Returns the raw body of a successful response.
    pub fn parse_bytes(&self, response: HttpResponse) -> Result<Vec<u8>, ApiError> {
        if !response.is_success() {
            return Err(self.error_from(&response));
        }
        Ok(response.body)
    }

    /// Normalizes a non-2xx response into `ApiError::Http`.
    ///
    /// The message is the body's `error` (or `message`) field when the body
    /// is JSON, the raw text when it is not, and the status text when the
    /// body is empty. 404s carry a hint naming the configured base URL.
    pub fn error_from(&self, response: &HttpResponse) -> ApiError {
        let text = String::from_utf8_lossy(&response.body).trim().to_string();
        let (message, details) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (
                body.error
                    .or(body.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| response.status_text()),
                body.details,
            ),
            Err(_) if !text.is_empty() => (text, None),
            Err(_) => (response.status_text(), None),
        };

        let message = if response.status == 404 {
            format!("{message} ({})", self.not_found_hint())
        } else {
            message
        };

        ApiError::Http {
            status: response.status,
            message,
            details,
        }
    }

    fn not_found_hint(&self) -> String {
        if self.config.base_url.is_empty() {
            format!("{BASE_URL_VAR} is not set; the API URL may be misconfigured")
        } else {
            format!(
                "check that {BASE_URL_VAR} ({}) points at the feedback API",
                self.config.base_url
            )
        }
    }

    fn send(&self, path: &str, options: &RequestOptions) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(path, options);
        debug!(
            method = request.method.as_str(),
            path,
            authenticated = request.header("authorization").is_some(),
            "api request"
        );
        let response = self.transport.execute(request)?;
        if !response.is_success() {
            debug!(path, status = response.status, "api request failed");
        }
        Ok(response)
    }

    /// Performs a request and decodes the JSON body into `R`.
    pub fn request<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let response = self.send(path, &options)?;
        self.parse_response(response)
    }

    /// Performs a request and returns the body untouched.
    pub fn request_bytes(&self, path: &str, options: RequestOptions) -> Result<Vec<u8>, ApiError> {
        let response = self.send(path, &options)?;
        self.parse_bytes(response)
    }

    /// Performs a request and unwraps `field` from the response envelope.
    pub(crate) fn request_field<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
        field: &str,
    ) -> Result<R, ApiError> {
        let envelope: Value = self.request(path, options)?;
        unwrap_envelope(envelope, field)
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Signs in and stores the issued token.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<SignInResponse, ApiError> {
        let payload = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let options = RequestOptions::json(HttpMethod::Post, &payload)?.skip_auth();
        let response: SignInResponse = self.request("/auth/sign_in", options)?;
        self.set_token(&response.token)?;
        info!(user = %response.user.id, "signed in");
        Ok(response)
    }

    /// Creates an account. The token is stored only when one is issued; an
    /// account awaiting email confirmation gets none.
    pub fn sign_up(&self, payload: &SignUpRequest) -> Result<SignUpResponse, ApiError> {
        let options = RequestOptions::json(HttpMethod::Post, payload)?.skip_auth();
        let response: SignUpResponse = self.request("/auth/sign_up", options)?;
        match &response.token {
            Some(token) if !response.requires_confirmation => self.set_token(token)?,
            _ => info!(email = %payload.email, "sign-up awaiting email confirmation"),
        }
        Ok(response)
    }

    pub fn sign_out(&self) -> Result<(), ApiError> {
        self.clear_token()
    }

    /// Fetches the signed-in user.
    ///
    /// Never fails: without a token no request is made, and any failure
    /// clears the stored token and reports "not signed in".
    pub fn get_current_user(&self) -> Option<User> {
        self.token()?;
        match self.fetch_current_user() {
            Ok(user) => Some(user),
            Err(e) => {
                info!("identity fetch failed, treating as signed out: {e}");
                if let Err(e) = self.clear_token() {
                    warn!("could not clear stored token: {e}");
                }
                None
            }
        }
    }

    /// Fetches the signed-in user, leaving the stored token alone on failure.
    pub fn fetch_current_user(&self) -> Result<User, ApiError> {
        self.request_field("/auth/me", RequestOptions::get(), "user")
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let options = RequestOptions::json(HttpMethod::Put, update)?;
        self.request_field("/auth/me", options, "user")
    }
}
