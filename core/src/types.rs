//! Domain DTOs for the feedback API.
//!
//! # Design
//! These mirror the backend's JSON shapes and are decoded with serde, so a
//! response missing a required field fails with a deserialization error
//! instead of leaking half-filled values to callers. Write payloads skip
//! `None` fields; the backend leaves omitted fields unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub has_payment_method: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignInResponse {
    pub token: String,
    pub user: User,
}

/// Sign-up answer. When the backend wants the address verified first it
/// sends `requiresConfirmation: true` and no token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignUpResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, rename = "requiresConfirmation")]
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
}

/// A business location customers leave feedback for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub google_review_url: Option<String>,
    #[serde(default)]
    pub yelp_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_review_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yelp_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_review_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yelp_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
}

/// One customer rating, optionally with a private comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackSubmission {
    pub id: Uuid,
    pub location_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeedback {
    pub location_id: Uuid,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub id: Uuid,
    pub location_id: Uuid,
    pub body: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSuggestion {
    pub location_id: Uuid,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A subscription plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u32,
    pub interval: String,
    #[serde(default)]
    pub location_limit: Option<u32>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlan {
    pub name: String,
    pub price_cents: u32,
    pub interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_limit: Option<u32>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Aggregate counts shown on the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub locations: u64,
    pub feedback_total: u64,
    pub positive_feedback: u64,
    pub negative_feedback: u64,
    pub suggestions: u64,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OnboardingState {
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub location_id: Option<Uuid>,
    #[serde(default)]
    pub plan_id: Option<Uuid>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOnboarding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Fields an administrator may change on any account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","email":"a@b.c","name":"Ann"}"#,
        )
        .unwrap();
        assert!(!user.admin);
        assert!(user.business_name.is_none());
        assert!(user.trial_ends_at.is_none());
    }

    #[test]
    fn user_requires_email() {
        let result: Result<User, _> =
            serde_json::from_str(r#"{"id":"00000000-0000-0000-0000-000000000001","name":"Ann"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn sign_up_response_reads_camel_case_flag() {
        let response: SignUpResponse = serde_json::from_str(r#"{"requiresConfirmation":true}"#).unwrap();
        assert!(response.requires_confirmation);
        assert!(response.token.is_none());
        assert!(response.user.is_none());
    }

    #[test]
    fn sign_up_request_omits_missing_business_name() {
        let request = SignUpRequest {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
            name: "Ann".to_string(),
            business_name: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("business_name").is_none());
    }

    #[test]
    fn update_location_serializes_only_present_fields() {
        let update = UpdateLocation {
            name: Some("Downtown".to_string()),
            ..UpdateLocation::default()
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Downtown"}));
    }
}
