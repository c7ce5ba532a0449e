//! Administrator endpoints under `/admin`.
//!
//! The backend rejects these for non-admin tokens with 403; the client does
//! not check `User::admin` itself.

use uuid::Uuid;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::export::{ExportFile, ExportKind};
use crate::http::{HttpMethod, Transport};
use crate::store::KeyValueStore;
use crate::types::{
    AdminUserUpdate, FeedbackSubmission, Location, NewPlan, Plan, Suggestion, UpdatePlan, User,
};

impl<T: Transport, S: KeyValueStore> ApiClient<T, S> {
    pub fn admin_list_users(&self) -> Result<Vec<User>, ApiError> {
        self.request_field("/admin/users", RequestOptions::get(), "users")
    }

    pub fn admin_get_user(&self, id: Uuid) -> Result<User, ApiError> {
        self.request_field(&format!("/admin/users/{id}"), RequestOptions::get(), "user")
    }

    pub fn admin_update_user(&self, id: Uuid, input: &AdminUserUpdate) -> Result<User, ApiError> {
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        self.request_field(&format!("/admin/users/{id}"), options, "user")
    }

    pub fn admin_delete_user(&self, id: Uuid) -> Result<(), ApiError> {
        self.request_bytes(&format!("/admin/users/{id}"), RequestOptions::delete())?;
        Ok(())
    }

    pub fn admin_list_locations(&self) -> Result<Vec<Location>, ApiError> {
        self.request_field("/admin/locations", RequestOptions::get(), "locations")
    }

    pub fn admin_delete_location(&self, id: Uuid) -> Result<(), ApiError> {
        self.request_bytes(&format!("/admin/locations/{id}"), RequestOptions::delete())?;
        Ok(())
    }

    pub fn admin_list_feedback(&self) -> Result<Vec<FeedbackSubmission>, ApiError> {
        self.request_field("/admin/feedback", RequestOptions::get(), "feedback")
    }

    pub fn admin_delete_feedback(&self, id: Uuid) -> Result<(), ApiError> {
        self.request_bytes(&format!("/admin/feedback/{id}"), RequestOptions::delete())?;
        Ok(())
    }

    pub fn admin_list_suggestions(&self) -> Result<Vec<Suggestion>, ApiError> {
        self.request_field("/admin/suggestions", RequestOptions::get(), "suggestions")
    }

    pub fn admin_delete_suggestion(&self, id: Uuid) -> Result<(), ApiError> {
        self.request_bytes(&format!("/admin/suggestions/{id}"), RequestOptions::delete())?;
        Ok(())
    }

    pub fn admin_list_plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.request_field("/admin/plans", RequestOptions::get(), "plans")
    }

    pub fn admin_create_plan(&self, input: &NewPlan) -> Result<Plan, ApiError> {
        let options = RequestOptions::json(HttpMethod::Post, input)?;
        self.request_field("/admin/plans", options, "plan")
    }

    pub fn admin_update_plan(&self, id: Uuid, input: &UpdatePlan) -> Result<Plan, ApiError> {
        let options = RequestOptions::json(HttpMethod::Put, input)?;
        self.request_field(&format!("/admin/plans/{id}"), options, "plan")
    }

    pub fn admin_delete_plan(&self, id: Uuid) -> Result<(), ApiError> {
        self.request_bytes(&format!("/admin/plans/{id}"), RequestOptions::delete())?;
        Ok(())
    }

    /// Downloads a CSV export, named for today's date.
    pub fn admin_export(&self, kind: ExportKind) -> Result<ExportFile, ApiError> {
        let options = RequestOptions::get().header("accept", "text/csv");
        let bytes = self.request_bytes(kind.path(), options)?;
        Ok(ExportFile::today(kind, bytes))
    }
}
