//! Administrator endpoints, including the CSV exports.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::models::{AdminUserUpdate, Feedback, NewPlan, Plan, Suggestion, UpdatePlan, User};
use crate::{ErrorResponse, MockState};

type Reply = Result<Json<Value>, ErrorResponse>;

/// Quotes a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

fn csv_response(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    )
        .into_response()
}

pub fn feedback_csv(rows: &[&Feedback]) -> String {
    let mut out = csv_row(&[
        "id".into(),
        "location_id".into(),
        "rating".into(),
        "comment".into(),
        "customer_name".into(),
        "customer_email".into(),
        "created_at".into(),
    ]);
    for f in rows {
        out.push_str(&csv_row(&[
            f.id.to_string(),
            f.location_id.to_string(),
            f.rating.to_string(),
            f.comment.clone().unwrap_or_default(),
            f.customer_name.clone().unwrap_or_default(),
            f.customer_email.clone().unwrap_or_default(),
            f.created_at.to_rfc3339(),
        ]));
    }
    out
}

pub fn suggestions_csv(rows: &[&Suggestion]) -> String {
    let mut out = csv_row(&[
        "id".into(),
        "location_id".into(),
        "body".into(),
        "email".into(),
        "created_at".into(),
    ]);
    for s in rows {
        out.push_str(&csv_row(&[
            s.id.to_string(),
            s.location_id.to_string(),
            s.body.clone(),
            s.email.clone().unwrap_or_default(),
            s.created_at.to_rfc3339(),
        ]));
    }
    out
}

// --- users ---

pub async fn list_users(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    let mut accounts: Vec<_> = db.accounts.values().collect();
    accounts.sort_by_key(|account| account.created_at);
    let users: Vec<&User> = accounts.iter().map(|account| &account.user).collect();
    Ok(Json(json!({ "users": users })))
}

pub async fn get_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Reply {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    let account = db
        .accounts
        .get(&id)
        .ok_or_else(|| ErrorResponse::not_found("User"))?;
    Ok(Json(json!({ "user": account.user })))
}

pub async fn update_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<AdminUserUpdate>,
) -> Reply {
    state.authenticate_admin(&headers).await?;
    let mut db = state.db.write().await;
    let account = db
        .accounts
        .get_mut(&id)
        .ok_or_else(|| ErrorResponse::not_found("User"))?;
    let user = &mut account.user;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(business_name) = input.business_name {
        user.business_name = Some(business_name);
    }
    if let Some(plan) = input.plan {
        user.plan = Some(plan);
    }
    if let Some(admin) = input.admin {
        user.admin = admin;
    }
    if let Some(trial_ends_at) = input.trial_ends_at {
        user.trial_ends_at = Some(trial_ends_at);
    }
    Ok(Json(json!({ "user": user })))
}

pub async fn delete_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let admin = state.authenticate_admin(&headers).await?;
    if admin.id == id {
        return Err(ErrorResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "You cannot delete your own account",
        ));
    }
    let mut db = state.db.write().await;
    db.accounts
        .remove(&id)
        .ok_or_else(|| ErrorResponse::not_found("User"))?;
    db.sessions.retain(|_, user_id| *user_id != id);
    db.onboarding.remove(&id);
    let owned: Vec<Uuid> = db
        .locations
        .values()
        .filter(|l| l.owner_id == id)
        .map(|l| l.id)
        .collect();
    for location_id in owned {
        db.remove_location(location_id);
    }
    info!(user = %id, "account deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

// --- locations, feedback, suggestions ---

pub async fn list_locations(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    let mut locations: Vec<_> = db.locations.values().collect();
    locations.sort_by_key(|l| l.created_at);
    Ok(Json(json!({ "locations": locations })))
}

pub async fn delete_location(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    let mut db = state.db.write().await;
    db.remove_location(id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ErrorResponse::not_found("Location"))
}

fn sorted_feedback(feedback: &HashMap<Uuid, Feedback>) -> Vec<&Feedback> {
    let mut rows: Vec<_> = feedback.values().collect();
    rows.sort_by_key(|f| f.created_at);
    rows
}

fn sorted_suggestions(suggestions: &HashMap<Uuid, Suggestion>) -> Vec<&Suggestion> {
    let mut rows: Vec<_> = suggestions.values().collect();
    rows.sort_by_key(|s| s.created_at);
    rows
}

pub async fn list_feedback(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    Ok(Json(json!({ "feedback": sorted_feedback(&db.feedback) })))
}

pub async fn delete_feedback(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    let mut db = state.db.write().await;
    db.feedback
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ErrorResponse::not_found("Feedback"))
}

pub async fn export_feedback(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Response, ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    Ok(csv_response(feedback_csv(&sorted_feedback(&db.feedback))))
}

pub async fn list_suggestions(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    Ok(Json(json!({ "suggestions": sorted_suggestions(&db.suggestions) })))
}

pub async fn delete_suggestion(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    let mut db = state.db.write().await;
    db.suggestions
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ErrorResponse::not_found("Suggestion"))
}

pub async fn export_suggestions(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Response, ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    Ok(csv_response(suggestions_csv(&sorted_suggestions(&db.suggestions))))
}

// --- plans ---

pub async fn list_plans(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    state.authenticate_admin(&headers).await?;
    let db = state.db.read().await;
    let mut plans: Vec<_> = db.plans.values().collect();
    plans.sort_by_key(|p| p.price_cents);
    Ok(Json(json!({ "plans": plans })))
}

pub async fn create_plan(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<NewPlan>,
) -> Result<(StatusCode, Json<Value>), ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    if input.name.trim().is_empty() {
        return Err(ErrorResponse::validation("name", "can't be blank"));
    }
    let plan = Plan {
        id: Uuid::new_v4(),
        name: input.name,
        price_cents: input.price_cents,
        interval: input.interval,
        location_limit: input.location_limit,
        active: input.active,
    };
    state.db.write().await.plans.insert(plan.id, plan.clone());
    Ok((StatusCode::CREATED, Json(json!({ "plan": plan }))))
}

pub async fn update_plan(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePlan>,
) -> Reply {
    state.authenticate_admin(&headers).await?;
    let mut db = state.db.write().await;
    let plan = db
        .plans
        .get_mut(&id)
        .ok_or_else(|| ErrorResponse::not_found("Plan"))?;
    if let Some(name) = input.name {
        plan.name = name;
    }
    if let Some(price_cents) = input.price_cents {
        plan.price_cents = price_cents;
    }
    if let Some(interval) = input.interval {
        plan.interval = interval;
    }
    if let Some(limit) = input.location_limit {
        plan.location_limit = Some(limit);
    }
    if let Some(active) = input.active {
        plan.active = active;
    }
    Ok(Json(json!({ "plan": plan })))
}

pub async fn delete_plan(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    state.authenticate_admin(&headers).await?;
    let mut db = state.db.write().await;
    db.plans
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ErrorResponse::not_found("Plan"))
}
