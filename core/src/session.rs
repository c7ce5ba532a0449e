//! Process-wide authentication state.
//!
//! # Design
//! `Session` owns an `ApiClient` and publishes a `SessionState` through a
//! `tokio::sync::watch` channel; anything rendering "who is signed in"
//! holds a receiver from `subscribe()`.
//!
//! Lifecycle: `Uninitialized` (loading) → `initialize()` runs the single
//! identity fetch → `Anonymous` or `Authenticated`. After that only explicit
//! calls change state. The stored token is always written before the cached
//! user, and the cached user before receivers are notified.
//!
//! Each state change is tagged with a generation number taken when the
//! operation starts its identity fetch. A result is applied only while its
//! generation is still the latest, so a slow fetch that was overtaken (for
//! example by `sign_out`) is dropped instead of resurrecting stale state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::store::KeyValueStore;
use crate::types::{SignUpRequest, User};

/// Snapshot of the session published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
}

impl SessionState {
    fn uninitialized() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading) {
            (_, true) => SessionPhase::Uninitialized,
            (None, false) => SessionPhase::Anonymous,
            (Some(_), false) => SessionPhase::Authenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Anonymous,
    Authenticated,
}

/// Result of a successful sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    SignedIn(User),
    /// The account exists but must be verified by email before signing in.
    ConfirmationRequired { email: String },
}

pub struct Session<T, S> {
    client: ApiClient<T, S>,
    state: watch::Sender<SessionState>,
    initialized: AtomicBool,
    generation: AtomicU64,
}

impl<T: Transport, S: KeyValueStore> Session<T, S> {
    pub fn new(client: ApiClient<T, S>) -> Self {
        let (state, _) = watch::channel(SessionState::uninitialized());
        Self {
            client,
            state,
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &ApiClient<T, S> {
        &self.client
    }

    /// Ends the session service and hands back the client. Subscribers see
    /// their channel close.
    pub fn into_client(self) -> ApiClient<T, S> {
        debug!("session closed");
        self.client
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publishes `user` unless a later operation has started since
    /// `generation` was taken.
    fn apply(&self, generation: u64, user: Option<User>) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = SessionState {
                user,
                loading: false,
            };
            true
        });
        if !applied {
            debug!(generation, "dropping superseded session update");
        }
        applied
    }

    /// Resolves the persisted token into a user. Only the first call does
    /// any work; later calls return the current state.
    pub fn initialize(&self) -> SessionState {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return self.state();
        }
        let generation = self.begin();
        let user = self.client.get_current_user();
        debug!(signed_in = user.is_some(), "session initialized");
        self.apply(generation, user);
        self.state()
    }

    /// Signs in and publishes the user. A rejected sign-in leaves the state
    /// untouched; a failed identity fetch afterwards leaves it anonymous.
    /// Either way the error is returned for inline display.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let response = self.client.sign_in(email, password).map_err(|e| {
            info!("sign-in failed: {e}");
            e
        })?;
        debug!(user = %response.user.id, "fetching identity after sign-in");
        self.establish()
    }

    /// Creates an account. When the backend requires email confirmation no
    /// token is stored, the state is untouched and the caller is told to
    /// show the verification screen.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        business_name: Option<&str>,
    ) -> Result<SignUpOutcome, ApiError> {
        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            business_name: business_name.map(str::to_string),
        };
        let response = self.client.sign_up(&request).map_err(|e| {
            info!("sign-up failed: {e}");
            e
        })?;
        if response.requires_confirmation || response.token.is_none() {
            return Ok(SignUpOutcome::ConfirmationRequired {
                email: request.email,
            });
        }

        self.establish().map(SignUpOutcome::SignedIn)
    }

    /// Resolves the token just issued into the signed-in user. If the
    /// identity fetch fails the token is dropped and the session goes
    /// anonymous, so a published user always has a stored token.
    fn establish(&self) -> Result<User, ApiError> {
        let generation = self.begin();
        match self.client.fetch_current_user() {
            Ok(user) => {
                self.apply(generation, Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                warn!("identity fetch after sign-in failed: {e}");
                if let Err(clear) = self.client.clear_token() {
                    warn!("could not clear stored token: {clear}");
                }
                self.apply(generation, None);
                Err(e)
            }
        }
    }

    /// Forgets the token and the user. Any identity fetch still in flight is
    /// superseded.
    pub fn sign_out(&self) {
        let generation = self.begin();
        if let Err(e) = self.client.sign_out() {
            warn!("could not clear stored token: {e}");
        }
        self.apply(generation, None);
        info!("signed out");
    }

    /// Re-fetches the user with the current token.
    pub fn refresh_user(&self) -> Option<User> {
        let generation = self.begin();
        let user = self.client.get_current_user();
        self.apply(generation, user.clone());
        user
    }

    /// Finishes an OAuth sign-in whose redirect carries `?token=...`.
    ///
    /// Without a token parameter the existing token (if any) is refreshed.
    pub fn complete_oauth_redirect(&self, redirect: &Url) -> Result<Option<User>, ApiError> {
        let token = redirect
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty());
        match token {
            Some(token) => self.client.set_token(&token)?,
            None => warn!("oauth redirect carried no token"),
        }
        Ok(self.refresh_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::store::MemoryStore;

    struct Offline;

    impl Transport for Offline {
        fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            Err(ApiError::Transport("offline".to_string()))
        }
    }

    fn session() -> Session<Offline, MemoryStore> {
        Session::new(ApiClient::new(
            ClientConfig::new("http://localhost"),
            Offline,
            MemoryStore::new(),
        ))
    }

    #[test]
    fn superseded_update_is_dropped() {
        let session = session();
        let stale = session.begin();
        let latest = session.begin();

        assert!(session.apply(latest, None));
        assert!(!session.apply(stale, Some(user())));
        assert_eq!(session.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn sign_out_supersedes_in_flight_fetch() {
        let session = session();
        let in_flight = session.begin();
        session.sign_out();
        assert!(!session.apply(in_flight, Some(user())));
        assert!(session.user().is_none());
    }

    #[test]
    fn subscribers_see_each_applied_change() {
        let session = session();
        let mut rx = session.subscribe();
        assert!(rx.borrow().loading);

        let generation = session.begin();
        session.apply(generation, Some(user()));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().phase(), SessionPhase::Authenticated);
    }

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "email": "owner@example.com",
            "name": "Owner"
        }))
        .unwrap()
    }

    #[test]
    fn phase_follows_loading_then_user() {
        assert_eq!(SessionState::uninitialized().phase(), SessionPhase::Uninitialized);
        let anonymous = SessionState {
            user: None,
            loading: false,
        };
        assert_eq!(anonymous.phase(), SessionPhase::Anonymous);
        let signed_in = SessionState {
            user: Some(user()),
            loading: false,
        };
        assert_eq!(signed_in.phase(), SessionPhase::Authenticated);
    }
}
