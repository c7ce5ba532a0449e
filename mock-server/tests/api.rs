use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with, MockConfig, MockState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(String::new()).unwrap()
}

/// Signs up `email` and returns the issued token.
async fn sign_up(app: &Router, email: &str) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign_up",
            None,
            json!({"email": email, "password": "password123", "name": "Owner"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["token"].as_str().unwrap().to_string()
}

async fn create_location(app: &Router, token: &str, name: &str) -> Value {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/locations",
            Some(token),
            json!({"name": name}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["location"].clone()
}

fn admin_app() -> Router {
    app_with(MockState::new(MockConfig {
        admin_emails: vec!["admin@example.com".to_string()],
        ..MockConfig::default()
    }))
}

// --- auth ---

#[tokio::test]
async fn sign_up_then_me_returns_user() {
    let app = app();
    let token = sign_up(&app, "owner@example.com").await;

    let resp = app.oneshot(get("/api/v1/auth/me", Some(&token))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["user"]["email"], "owner@example.com");
    assert_eq!(body["user"]["admin"], false);
    assert!(body["user"]["trial_ends_at"].is_string());
}

#[tokio::test]
async fn me_without_token_is_401() {
    let resp = app().oneshot(get("/api/v1/auth/me", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Unauthorized");
}

#[tokio::test]
async fn sign_in_with_wrong_password_is_401() {
    let app = app();
    sign_up(&app, "owner@example.com").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign_in",
            None,
            json!({"email": "owner@example.com", "password": "nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await, json!({"error": "Invalid credentials"}));
}

#[tokio::test]
async fn duplicate_sign_up_reports_field_details() {
    let app = app();
    sign_up(&app, "owner@example.com").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign_up",
            None,
            json!({"email": "OWNER@example.com", "password": "password123", "name": "Again"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"]["email"][0], "has already been taken");
}

#[tokio::test]
async fn confirmation_gates_sign_in() {
    let state = MockState::new(MockConfig {
        require_confirmation: true,
        ..MockConfig::default()
    });
    let app = app_with(state.clone());

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign_up",
            None,
            json!({"email": "new@example.com", "password": "password123", "name": "New"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["requiresConfirmation"], true);
    assert!(body.get("token").is_none());

    let sign_in = || {
        json_request(
            "POST",
            "/api/v1/auth/sign_in",
            None,
            json!({"email": "new@example.com", "password": "password123"}),
        )
    };
    let resp = app.clone().oneshot(sign_in()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    assert!(state.confirm_email("new@example.com").await);
    let resp = app.oneshot(sign_in()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await["token"].is_string());
}

// --- locations ---

#[tokio::test]
async fn locations_are_scoped_to_their_owner() {
    let app = app();
    let alice = sign_up(&app, "alice@example.com").await;
    let bob = sign_up(&app, "bob@example.com").await;
    let location = create_location(&app, &alice, "Alice's Bakery").await;
    assert_eq!(location["slug"], "alice-s-bakery");
    let uri = format!("/api/v1/locations/{}", location["id"].as_str().unwrap());

    let resp = app.clone().oneshot(get(&uri, Some(&bob))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "Location not found");

    let resp = app
        .clone()
        .oneshot(get("/api/v1/locations", Some(&bob)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["locations"], json!([]));

    let resp = app.oneshot(get(&uri, Some(&alice))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn derived_slugs_get_numeric_suffix() {
    let app = app();
    let token = sign_up(&app, "owner@example.com").await;
    create_location(&app, &token, "Main Street").await;
    let second = create_location(&app, &token, "Main Street").await;
    assert_eq!(second["slug"], "main-street-2");
}

#[tokio::test]
async fn update_and_delete_location() {
    let app = app();
    let token = sign_up(&app, "owner@example.com").await;
    let location = create_location(&app, &token, "Old Name").await;
    let uri = format!("/api/v1/locations/{}", location["id"].as_str().unwrap());

    let resp = app
        .clone()
        .oneshot(json_request("PUT", &uri, Some(&token), json!({"name": "New Name"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["location"]["name"], "New Name");
    assert_eq!(body["location"]["slug"], "old-name");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app.oneshot(get(&uri, Some(&token))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- public flow & dashboard ---

#[tokio::test]
async fn public_feedback_feeds_dashboard() {
    let app = app();
    let token = sign_up(&app, "owner@example.com").await;
    let location = create_location(&app, &token, "Cafe").await;
    let location_id = location["id"].as_str().unwrap();

    let resp = app
        .clone()
        .oneshot(get("/api/v1/locations/public/cafe", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["location"]["id"], location_id);

    for rating in [5, 2] {
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/feedback",
                None,
                json!({"location_id": location_id, "rating": rating}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/suggestions",
            None,
            json!({"location_id": location_id, "body": "More oat milk"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.oneshot(get("/api/v1/dashboard", Some(&token))).await.unwrap();
    let dashboard = body_json(resp).await["dashboard"].clone();
    assert_eq!(dashboard["locations"], 1);
    assert_eq!(dashboard["feedback_total"], 2);
    assert_eq!(dashboard["positive_feedback"], 1);
    assert_eq!(dashboard["negative_feedback"], 1);
    assert_eq!(dashboard["suggestions"], 1);
    assert_eq!(dashboard["average_rating"], 3.5);
}

#[tokio::test]
async fn feedback_rating_out_of_range_is_rejected() {
    let app = app();
    let token = sign_up(&app, "owner@example.com").await;
    let location = create_location(&app, &token, "Cafe").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/v1/feedback",
            None,
            json!({"location_id": location["id"], "rating": 6}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["details"]["rating"][0], "must be between 1 and 5");
}

#[tokio::test]
async fn onboarding_records_plan_choice() {
    let app = app();
    let token = sign_up(&app, "owner@example.com").await;

    let resp = app.clone().oneshot(get("/api/v1/plans", None)).await.unwrap();
    let plans = body_json(resp).await["plans"].clone();
    assert_eq!(plans[0]["name"], "Starter");
    let plan_id = plans[0]["id"].clone();

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/onboarding",
            Some(&token),
            json!({"plan_id": plan_id, "completed": true}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["onboarding"]["completed"], true);

    let resp = app.oneshot(get("/api/v1/auth/me", Some(&token))).await.unwrap();
    assert_eq!(body_json(resp).await["user"]["plan"], "Starter");
}

// --- admin ---

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let app = admin_app();
    let token = sign_up(&app, "owner@example.com").await;

    let resp = app.oneshot(get("/api/v1/admin/users", Some(&token))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "Admin access required");
}

#[tokio::test]
async fn admin_exports_feedback_as_csv() {
    let app = admin_app();
    let owner = sign_up(&app, "owner@example.com").await;
    let admin = sign_up(&app, "admin@example.com").await;
    let location = create_location(&app, &owner, "Cafe").await;
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/feedback",
            None,
            json!({"location_id": location["id"], "rating": 1, "comment": "Cold, late"}),
        ))
        .await
        .unwrap();

    let resp = app
        .oneshot(get("/api/v1/admin/feedback/export", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("id,location_id,rating,comment,customer_name,customer_email,created_at")
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",1,\"Cold, late\",,,"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn admin_cannot_delete_self() {
    let app = admin_app();
    let admin = sign_up(&app, "admin@example.com").await;
    let resp = app
        .clone()
        .oneshot(get("/api/v1/auth/me", Some(&admin)))
        .await
        .unwrap();
    let id = body_json(resp).await["user"]["id"].as_str().unwrap().to_string();

    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/admin/users/{id}"))
                .header(http::header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- routing ---

#[tokio::test]
async fn unknown_route_is_json_404() {
    let resp = app().oneshot(get("/api/v2/auth/me", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "Route not found");
}
