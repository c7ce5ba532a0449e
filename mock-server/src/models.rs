//! Records held by the mock backend and the payloads it accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub business_name: Option<String>,
    pub plan: Option<String>,
    pub admin: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub has_payment_method: bool,
}

#[derive(Clone, Debug)]
pub struct Account {
    pub user: User,
    pub password: String,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub google_review_url: Option<String>,
    pub yelp_url: Option<String>,
    pub facebook_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: Uuid,
    pub location_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Ratings of four stars and up are routed to public review sites.
    pub fn is_positive(&self) -> bool {
        self.rating >= 4
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub id: Uuid,
    pub location_id: Uuid,
    pub body: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u32,
    pub interval: String,
    pub location_limit: Option<u32>,
    pub active: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Onboarding {
    pub step: Option<String>,
    pub location_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub business_name: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub business_name: Option<String>,
}

#[derive(Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub slug: Option<String>,
    pub google_review_url: Option<String>,
    pub yelp_url: Option<String>,
    pub facebook_url: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLocation {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub google_review_url: Option<String>,
    pub yelp_url: Option<String>,
    pub facebook_url: Option<String>,
}

#[derive(Deserialize)]
pub struct NewFeedback {
    pub location_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Deserialize)]
pub struct NewSuggestion {
    pub location_id: Uuid,
    pub body: String,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct NewPlan {
    pub name: String,
    pub price_cents: u32,
    pub interval: String,
    pub location_limit: Option<u32>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Deserialize)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub price_cents: Option<u32>,
    pub interval: Option<String>,
    pub location_limit: Option<u32>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateOnboarding {
    pub step: Option<String>,
    pub location_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub completed: Option<bool>,
}

#[derive(Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub plan: Option<String>,
    pub admin: Option<bool>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Lowercase, dash-separated form of a business name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "location".to_string()
    } else {
        trimmed.to_string()
    }
}
