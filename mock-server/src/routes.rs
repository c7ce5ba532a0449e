//! Authentication, owner and public endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    self, Account, Feedback, Location, NewFeedback, NewLocation, NewSuggestion, Onboarding,
    ProfileUpdate, SignIn, SignUp, Suggestion, UpdateLocation, UpdateOnboarding, User,
};
use crate::{Db, ErrorResponse, MockState};

const TRIAL_DAYS: i64 = 14;
const MIN_PASSWORD_LEN: usize = 8;

type Reply = Result<Json<Value>, ErrorResponse>;
type Created = Result<(StatusCode, Json<Value>), ErrorResponse>;

// --- auth ---

pub async fn sign_in(State(state): State<MockState>, Json(input): Json<SignIn>) -> Reply {
    let mut db = state.db.write().await;
    let account = db
        .account_by_email(&input.email)
        .filter(|account| account.password == input.password)
        .ok_or_else(|| ErrorResponse::new(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    if !account.confirmed {
        return Err(ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "Please confirm your email before signing in",
        ));
    }
    let user = account.user.clone();
    let token = db.issue_token(user.id);
    info!(user = %user.id, "signed in");
    Ok(Json(json!({ "token": token, "user": user })))
}

pub async fn sign_up(State(state): State<MockState>, Json(input): Json<SignUp>) -> Created {
    if !input.email.contains('@') {
        return Err(ErrorResponse::validation("email", "is invalid"));
    }
    if input.password.len() < MIN_PASSWORD_LEN {
        return Err(ErrorResponse::validation(
            "password",
            "is too short (minimum is 8 characters)",
        ));
    }
    if input.name.trim().is_empty() {
        return Err(ErrorResponse::validation("name", "can't be blank"));
    }

    let mut db = state.db.write().await;
    if db.account_by_email(&input.email).is_some() {
        return Err(ErrorResponse::validation("email", "has already been taken"));
    }

    let user = User {
        id: Uuid::new_v4(),
        admin: state
            .config
            .admin_emails
            .iter()
            .any(|email| email.eq_ignore_ascii_case(&input.email)),
        email: input.email,
        name: input.name,
        business_name: input.business_name,
        plan: None,
        trial_ends_at: Some(Utc::now() + Duration::days(TRIAL_DAYS)),
        has_payment_method: false,
    };
    let confirmed = !state.config.require_confirmation;
    db.accounts.insert(
        user.id,
        Account {
            user: user.clone(),
            password: input.password,
            confirmed,
            created_at: Utc::now(),
        },
    );
    info!(user = %user.id, confirmed, "account created");

    if !confirmed {
        return Ok((
            StatusCode::CREATED,
            Json(json!({ "requiresConfirmation": true, "user": user })),
        ));
    }
    let token = db.issue_token(user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user, "requiresConfirmation": false })),
    ))
}

pub async fn me(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = state.authenticate(&headers).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn update_me(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<ProfileUpdate>,
) -> Reply {
    let user = state.authenticate(&headers).await?;
    let mut db = state.db.write().await;
    if let Some(email) = &input.email {
        if db
            .account_by_email(email)
            .is_some_and(|other| other.user.id != user.id)
        {
            return Err(ErrorResponse::validation("email", "has already been taken"));
        }
    }
    let account = db
        .accounts
        .get_mut(&user.id)
        .ok_or_else(ErrorResponse::unauthorized)?;
    if let Some(name) = input.name {
        account.user.name = name;
    }
    if let Some(email) = input.email {
        account.user.email = email;
    }
    if let Some(business_name) = input.business_name {
        account.user.business_name = Some(business_name);
    }
    Ok(Json(json!({ "user": account.user })))
}

// --- locations ---

fn owned_location<'a>(db: &'a Db, owner: &User, id: Uuid) -> Result<&'a Location, ErrorResponse> {
    db.locations
        .get(&id)
        .filter(|location| location.owner_id == owner.id)
        .ok_or_else(|| ErrorResponse::not_found("Location"))
}

/// Slug for a new location: explicit slugs must be free, derived ones get a
/// numeric suffix until they are.
fn allocate_slug(db: &Db, requested: Option<&str>, name: &str) -> Result<String, ErrorResponse> {
    if let Some(requested) = requested {
        let slug = models::slugify(requested);
        if db.slug_taken(&slug, None) {
            return Err(ErrorResponse::validation("slug", "has already been taken"));
        }
        return Ok(slug);
    }
    let base = models::slugify(name);
    let mut slug = base.clone();
    let mut n = 2;
    while db.slug_taken(&slug, None) {
        slug = format!("{base}-{n}");
        n += 1;
    }
    Ok(slug)
}

pub async fn list_locations(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = state.authenticate(&headers).await?;
    let db = state.db.read().await;
    let mut locations: Vec<&Location> = db
        .locations
        .values()
        .filter(|location| location.owner_id == user.id)
        .collect();
    locations.sort_by_key(|location| location.created_at);
    Ok(Json(json!({ "locations": locations })))
}

pub async fn get_location(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Reply {
    let user = state.authenticate(&headers).await?;
    let db = state.db.read().await;
    let location = owned_location(&db, &user, id)?;
    Ok(Json(json!({ "location": location })))
}

pub async fn create_location(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<NewLocation>,
) -> Created {
    let user = state.authenticate(&headers).await?;
    if input.name.trim().is_empty() {
        return Err(ErrorResponse::validation("name", "can't be blank"));
    }
    let mut db = state.db.write().await;
    let slug = allocate_slug(&db, input.slug.as_deref(), &input.name)?;
    let location = Location {
        id: Uuid::new_v4(),
        owner_id: user.id,
        name: input.name,
        slug,
        google_review_url: input.google_review_url,
        yelp_url: input.yelp_url,
        facebook_url: input.facebook_url,
        created_at: Utc::now(),
    };
    db.locations.insert(location.id, location.clone());
    Ok((StatusCode::CREATED, Json(json!({ "location": location }))))
}

pub async fn update_location(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateLocation>,
) -> Reply {
    let user = state.authenticate(&headers).await?;
    let mut db = state.db.write().await;
    owned_location(&db, &user, id)?;
    let slug = input.slug.as_deref().map(models::slugify);
    if let Some(slug) = &slug {
        if db.slug_taken(slug, Some(id)) {
            return Err(ErrorResponse::validation("slug", "has already been taken"));
        }
    }
    let location = db
        .locations
        .get_mut(&id)
        .ok_or_else(|| ErrorResponse::not_found("Location"))?;
    if let Some(name) = input.name {
        location.name = name;
    }
    if let Some(slug) = slug {
        location.slug = slug;
    }
    if let Some(url) = input.google_review_url {
        location.google_review_url = Some(url);
    }
    if let Some(url) = input.yelp_url {
        location.yelp_url = Some(url);
    }
    if let Some(url) = input.facebook_url {
        location.facebook_url = Some(url);
    }
    Ok(Json(json!({ "location": location })))
}

pub async fn delete_location(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let user = state.authenticate(&headers).await?;
    let mut db = state.db.write().await;
    owned_location(&db, &user, id)?;
    db.remove_location(id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn public_location(
    State(state): State<MockState>,
    Path(id_or_slug): Path<String>,
) -> Reply {
    let db = state.db.read().await;
    let by_id = id_or_slug
        .parse::<Uuid>()
        .ok()
        .and_then(|id| db.locations.get(&id));
    let location = by_id
        .or_else(|| db.locations.values().find(|l| l.slug == id_or_slug))
        .ok_or_else(|| ErrorResponse::not_found("Location"))?;
    Ok(Json(json!({ "location": location })))
}

// --- public submissions ---

pub async fn create_feedback(
    State(state): State<MockState>,
    Json(input): Json<NewFeedback>,
) -> Created {
    if !(1..=5).contains(&input.rating) {
        return Err(ErrorResponse::validation("rating", "must be between 1 and 5"));
    }
    let mut db = state.db.write().await;
    if !db.locations.contains_key(&input.location_id) {
        return Err(ErrorResponse::not_found("Location"));
    }
    let feedback = Feedback {
        id: Uuid::new_v4(),
        location_id: input.location_id,
        rating: input.rating,
        comment: input.comment,
        customer_name: input.customer_name,
        customer_email: input.customer_email,
        created_at: Utc::now(),
    };
    db.feedback.insert(feedback.id, feedback.clone());
    Ok((StatusCode::CREATED, Json(json!({ "feedback": feedback }))))
}

pub async fn list_feedback(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = state.authenticate(&headers).await?;
    let db = state.db.read().await;
    let mut feedback: Vec<&Feedback> = db
        .feedback
        .values()
        .filter(|f| {
            db.locations
                .get(&f.location_id)
                .is_some_and(|l| l.owner_id == user.id)
        })
        .collect();
    feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(json!({ "feedback": feedback })))
}

pub async fn create_suggestion(
    State(state): State<MockState>,
    Json(input): Json<NewSuggestion>,
) -> Created {
    if input.body.trim().is_empty() {
        return Err(ErrorResponse::validation("body", "can't be blank"));
    }
    let mut db = state.db.write().await;
    if !db.locations.contains_key(&input.location_id) {
        return Err(ErrorResponse::not_found("Location"));
    }
    let suggestion = Suggestion {
        id: Uuid::new_v4(),
        location_id: input.location_id,
        body: input.body,
        email: input.email,
        created_at: Utc::now(),
    };
    db.suggestions.insert(suggestion.id, suggestion.clone());
    Ok((StatusCode::CREATED, Json(json!({ "suggestion": suggestion }))))
}

pub async fn list_plans(State(state): State<MockState>) -> Json<Value> {
    let db = state.db.read().await;
    let mut plans: Vec<_> = db.plans.values().filter(|p| p.active).collect();
    plans.sort_by_key(|p| p.price_cents);
    Json(json!({ "plans": plans }))
}

// --- dashboard & onboarding ---

pub async fn dashboard(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = state.authenticate(&headers).await?;
    let db = state.db.read().await;
    let owned = |location_id: &Uuid| {
        db.locations
            .get(location_id)
            .is_some_and(|l| l.owner_id == user.id)
    };
    let feedback: Vec<&Feedback> = db.feedback.values().filter(|f| owned(&f.location_id)).collect();
    let positive = feedback.iter().filter(|f| f.is_positive()).count();
    let average_rating = if feedback.is_empty() {
        None
    } else {
        let total: u32 = feedback.iter().map(|f| u32::from(f.rating)).sum();
        Some(f64::from(total) / feedback.len() as f64)
    };
    Ok(Json(json!({
        "dashboard": {
            "locations": db.locations.values().filter(|l| l.owner_id == user.id).count(),
            "feedback_total": feedback.len(),
            "positive_feedback": positive,
            "negative_feedback": feedback.len() - positive,
            "suggestions": db.suggestions.values().filter(|s| owned(&s.location_id)).count(),
            "average_rating": average_rating,
        }
    })))
}

pub async fn get_onboarding(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = state.authenticate(&headers).await?;
    let db = state.db.read().await;
    let onboarding = db.onboarding.get(&user.id).cloned().unwrap_or_default();
    Ok(Json(json!({ "onboarding": onboarding })))
}

pub async fn update_onboarding(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<UpdateOnboarding>,
) -> Reply {
    let user = state.authenticate(&headers).await?;
    let mut db = state.db.write().await;
    let plan_name = match input.plan_id {
        Some(plan_id) => Some(
            db.plans
                .get(&plan_id)
                .map(|plan| plan.name.clone())
                .ok_or_else(|| ErrorResponse::not_found("Plan"))?,
        ),
        None => None,
    };
    if let Some(name) = plan_name {
        if let Some(account) = db.accounts.get_mut(&user.id) {
            account.user.plan = Some(name);
        }
    }
    let onboarding: &mut Onboarding = db.onboarding.entry(user.id).or_default();
    if input.step.is_some() {
        onboarding.step = input.step;
    }
    if input.location_id.is_some() {
        onboarding.location_id = input.location_id;
    }
    if input.plan_id.is_some() {
        onboarding.plan_id = input.plan_id;
    }
    if let Some(completed) = input.completed {
        onboarding.completed = completed;
    }
    Ok(Json(json!({ "onboarding": onboarding })))
}
