//! In-memory stand-in for the feedback backend.
//!
//! Serves the documented `/api/v1` surface with bearer-token auth and the
//! backend's `{error, details}` error bodies. Used for local development and
//! by the client core's live integration tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub mod admin;
pub mod models;
pub mod routes;

pub use models::{Account, Feedback, Location, Onboarding, Plan, Suggestion, User};

/// Behaviour switches for a mock backend instance.
#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// New accounts must confirm their email before they can sign in.
    pub require_confirmation: bool,
    /// Accounts created with these emails are administrators.
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Db {
    pub accounts: HashMap<Uuid, Account>,
    pub sessions: HashMap<String, Uuid>,
    pub locations: HashMap<Uuid, Location>,
    pub feedback: HashMap<Uuid, Feedback>,
    pub suggestions: HashMap<Uuid, Suggestion>,
    pub plans: HashMap<Uuid, Plan>,
    pub onboarding: HashMap<Uuid, Onboarding>,
}

impl Db {
    fn seeded() -> Self {
        let mut db = Self::default();
        for (name, price_cents, location_limit) in [("Starter", 1900, Some(1)), ("Growth", 4900, None)] {
            let plan = Plan {
                id: Uuid::new_v4(),
                name: name.to_string(),
                price_cents,
                interval: "month".to_string(),
                location_limit,
                active: true,
            };
            db.plans.insert(plan.id, plan);
        }
        db
    }

    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|account| account.user.email.eq_ignore_ascii_case(email))
    }

    pub fn issue_token(&mut self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user_id);
        token
    }

    /// Removes a location and everything submitted against it.
    pub fn remove_location(&mut self, id: Uuid) -> Option<Location> {
        let location = self.locations.remove(&id)?;
        self.feedback.retain(|_, f| f.location_id != id);
        self.suggestions.retain(|_, s| s.location_id != id);
        Some(location)
    }

    pub fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.locations
            .values()
            .any(|l| l.slug == slug && Some(l.id) != except)
    }
}

/// Shared handle to the mock backend's data.
#[derive(Clone, Debug)]
pub struct MockState {
    pub db: Arc<RwLock<Db>>,
    pub config: Arc<MockConfig>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            db: Arc::new(RwLock::new(Db::seeded())),
            config: Arc::new(config),
        }
    }

    /// Marks an account's email as verified, as following the emailed link
    /// would. Returns `false` for unknown emails.
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut db = self.db.write().await;
        let id = match db.account_by_email(email) {
            Some(account) => account.user.id,
            None => return false,
        };
        if let Some(account) = db.accounts.get_mut(&id) {
            account.confirmed = true;
        }
        true
    }

    /// The user a bearer token belongs to.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ErrorResponse> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(ErrorResponse::unauthorized)?;
        let db = self.db.read().await;
        db.sessions
            .get(token)
            .and_then(|id| db.accounts.get(id))
            .map(|account| account.user.clone())
            .ok_or_else(ErrorResponse::unauthorized)
    }

    pub async fn authenticate_admin(&self, headers: &HeaderMap) -> Result<User, ErrorResponse> {
        let user = self.authenticate(headers).await?;
        if user.admin {
            Ok(user)
        } else {
            Err(ErrorResponse::new(StatusCode::FORBIDDEN, "Admin access required"))
        }
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

/// Error body in the backend's `{error, details?}` shape.
#[derive(Debug)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            error: error.to_string(),
            details: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, &format!("{what} not found"))
    }

    pub fn validation(field: &str, message: &str) -> Self {
        let mut details = BTreeMap::new();
        details.insert(field.to_string(), vec![message.to_string()]);
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: "Validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        debug!(status = %self.status, error = %self.error, "request rejected");
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with(MockState::default())
}

pub fn app_with(state: MockState) -> Router {
    let api = Router::new()
        .route("/auth/sign_in", post(routes::sign_in))
        .route("/auth/sign_up", post(routes::sign_up))
        .route("/auth/me", get(routes::me).put(routes::update_me))
        .route("/locations", get(routes::list_locations).post(routes::create_location))
        .route(
            "/locations/{id}",
            get(routes::get_location)
                .put(routes::update_location)
                .delete(routes::delete_location),
        )
        .route("/locations/public/{id_or_slug}", get(routes::public_location))
        .route("/feedback", get(routes::list_feedback).post(routes::create_feedback))
        .route("/suggestions", post(routes::create_suggestion))
        .route("/plans", get(routes::list_plans))
        .route("/dashboard", get(routes::dashboard))
        .route("/onboarding", get(routes::get_onboarding).put(routes::update_onboarding))
        .route("/admin/users", get(admin::list_users))
        .route(
            "/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/locations", get(admin::list_locations))
        .route("/admin/locations/{id}", delete(admin::delete_location))
        .route("/admin/feedback", get(admin::list_feedback))
        .route("/admin/feedback/export", get(admin::export_feedback))
        .route("/admin/feedback/{id}", delete(admin::delete_feedback))
        .route("/admin/suggestions", get(admin::list_suggestions))
        .route("/admin/suggestions/export", get(admin::export_suggestions))
        .route(
            "/admin/suggestions/{id}",
            delete(admin::delete_suggestion),
        )
        .route("/admin/plans", get(admin::list_plans).post(admin::create_plan))
        .route("/admin/plans/{id}", put(admin::update_plan).delete(admin::delete_plan));

    Router::new()
        .nest("/api/v1", api)
        .fallback(|| async { ErrorResponse::new(StatusCode::NOT_FOUND, "Route not found") })
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_db_has_active_plans() {
        let db = Db::seeded();
        assert_eq!(db.plans.len(), 2);
        assert!(db.plans.values().all(|p| p.active));
    }

    #[test]
    fn tokens_are_unique() {
        let mut db = Db::default();
        let id = Uuid::new_v4();
        let a = db.issue_token(id);
        let b = db.issue_token(id);
        assert_ne!(a, b);
        assert_eq!(db.sessions.len(), 2);
    }

    #[test]
    fn error_body_includes_details_only_when_present() {
        let err = ErrorResponse::validation("email", "has already been taken");
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.details.as_ref().unwrap()["email"], vec!["has already been taken"]);
        assert!(ErrorResponse::unauthorized().details.is_none());
    }
}
