//! Client core for the customer-feedback backend.
//!
//! # Overview
//! Every call to the backend goes through `ApiClient`, which composes URLs
//! from the configured base and the versioned prefix, attaches the stored
//! bearer token, and turns failures into one human-readable `ApiError`.
//! `Session` sits on top and tracks who is signed in for the rest of the
//! application.
//!
//! # Design
//! - The network and the token storage are injected (`Transport`,
//!   `KeyValueStore`), so tests run against scripted responses and an
//!   in-memory store.
//! - Request building and response parsing are pure; only `Transport`
//!   performs I/O.
//! - DTOs are decoded with serde: a malformed backend response fails loudly.
//! - Nothing is retried and the client imposes no timeouts of its own.

mod admin;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod onboarding;
mod resources;
pub mod session;
pub mod store;
pub mod types;

pub use client::{ApiClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{ApiError, FieldErrors};
pub use export::{ExportFile, ExportKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use onboarding::{OnboardingError, OnboardingFlow, OnboardingStep};
pub use session::{Session, SessionPhase, SessionState, SignUpOutcome};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, TOKEN_KEY};
pub use types::{
    AdminUserUpdate, DashboardSummary, FeedbackSubmission, Location, NewFeedback, NewLocation,
    NewPlan, NewSuggestion, OnboardingState, Plan, ProfileUpdate, SignInRequest, SignInResponse,
    SignUpRequest, SignUpResponse, Suggestion, UpdateLocation, UpdateOnboarding, UpdatePlan, User,
};
