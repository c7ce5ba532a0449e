//! Typed wrappers for the owner-facing and public endpoints.

use uuid::Uuid;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::http::{HttpMethod, Transport};
use crate::store::KeyValueStore;
use crate::types::{
    DashboardSummary, FeedbackSubmission, Location, NewFeedback, NewLocation, NewSuggestion,
    OnboardingState, Plan, Suggestion, UpdateLocation, UpdateOnboarding,
};

impl<T: Transport, S: KeyValueStore> ApiClient<T, S> {
    pub fn list_locations(&self) -> Result<Vec<Location>, ApiError> {
        self.request_field("/locations", RequestOptions::get(), "locations")
    }

    pub fn get_location(&self, id: Uuid) -> Result<Location, ApiError> {
        self.request_field(&format!("/locations/{id}"), RequestOptions::get(), "location")
    }

    pub fn create_location(&self, input: &NewLocation) -> Result<Location, ApiError> {
        let options = RequestOptions::json(HttpMethod::Post, input)?;
        self.request_field("/locations", options, "location")
    }

    pub fn update_location(&self, id: Uuid, input: &UpdateLocation) -> Result<Location, ApiError> {
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        self.request_field(&format!("/locations/{id}"), options, "location")
    }

    pub fn delete_location(&self, id: Uuid) -> Result<(), ApiError> {
        self.request_bytes(&format!("/locations/{id}"), RequestOptions::delete())?;
        Ok(())
    }

    /// Looks up a location for the public feedback form by id or slug.
    pub fn get_public_location(&self, id_or_slug: &str) -> Result<Location, ApiError> {
        self.request_field(
            &format!("/locations/public/{id_or_slug}"),
            RequestOptions::get().skip_auth(),
            "location",
        )
    }

    /// Submits a customer rating from the public form.
    pub fn create_feedback(&self, input: &NewFeedback) -> Result<FeedbackSubmission, ApiError> {
        let options = RequestOptions::json(HttpMethod::Post, input)?.skip_auth();
        self.request_field("/feedback", options, "feedback")
    }

    /// Feedback received across the signed-in owner's locations.
    pub fn list_feedback(&self) -> Result<Vec<FeedbackSubmission>, ApiError> {
        self.request_field("/feedback", RequestOptions::get(), "feedback")
    }

    pub fn create_suggestion(&self, input: &NewSuggestion) -> Result<Suggestion, ApiError> {
        let options = RequestOptions::json(HttpMethod::Post, input)?.skip_auth();
        self.request_field("/suggestions", options, "suggestion")
    }

    /// Plans offered on the pricing step of onboarding.
    pub fn list_plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.request_field("/plans", RequestOptions::get().skip_auth(), "plans")
    }

    pub fn dashboard(&self) -> Result<DashboardSummary, ApiError> {
        self.request_field("/dashboard", RequestOptions::get(), "dashboard")
    }

    pub fn get_onboarding(&self) -> Result<OnboardingState, ApiError> {
        self.request_field("/onboarding", RequestOptions::get(), "onboarding")
    }

    pub fn update_onboarding(&self, input: &UpdateOnboarding) -> Result<OnboardingState, ApiError> {
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        self.request_field("/onboarding", options, "onboarding")
    }
}
