mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{PASSWORD, TestApp, test_config, unique_email};
use lectern_config::RateLimitConfig;

#[tokio::test]
async fn test_admin_login_issues_admin_guard_token() {
    let app = TestApp::new().await;
    let email = unique_email("root");
    app.admin(&email).await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guard"], "admin");
    assert_eq!(body["kind"], "admin");
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_login_identifier_is_case_insensitive() {
    let app = TestApp::new().await;
    let email = unique_email("jane");
    app.user(&email, &[]).await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": email.to_uppercase(), "password": PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "user");
    assert_eq!(body["guard"], "user");
}

#[tokio::test]
async fn test_institute_login_uses_user_guard_and_shadow_row() {
    let app = TestApp::new().await;
    let email = unique_email("registrar");
    let institute = app.institute(&email, None).await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "institute");
    assert_eq!(body["guard"], "user");

    let shadows = app.store.shadow_users_of(institute.id.into_inner()).await;
    assert_eq!(shadows.len(), 1);
}

#[tokio::test]
async fn test_repeated_faculty_logins_keep_one_shadow_row() {
    let app = TestApp::new().await;
    let institute = app.institute(&unique_email("registrar"), None).await;
    let email = unique_email("dean");
    let faculty = app.faculty(institute.id, &email, None).await;

    app.login(&email).await;
    app.login(&email).await;

    let shadows = app.store.shadow_users_of(faculty.id.into_inner()).await;
    assert_eq!(shadows.len(), 1);
}

#[tokio::test]
async fn test_admin_takes_precedence_over_user_with_same_email() {
    let app = TestApp::new().await;
    let email = unique_email("shared");
    app.admin(&email).await;
    app.user(&email, &[]).await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "admin");
}

#[tokio::test]
async fn test_wrong_password_is_rejected_without_detail() {
    let app = TestApp::new().await;
    let email = unique_email("jane");
    app.user(&email, &[]).await;

    let (wrong, wrong_body) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": "not-it-at-all" }))
        .await;
    let (unknown, unknown_body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": unique_email("nobody"), "password": PASSWORD }),
        )
        .await;

    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_inactive_institute_cannot_log_in() {
    let app = TestApp::new().await;
    let email = unique_email("registrar");
    let institute = app.institute(&email, None).await;
    app.store.set_institute_active(institute.id, false).await;

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_login_payload_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "not-an-email", "password": "" }))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["fields"],
        json!({ "email": ["email is invalid"], "password": ["password is invalid"] })
    );
}

#[tokio::test]
async fn test_throttled_login_never_reaches_store() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        login_per_minute: 1,
        login_burst: 1,
    };
    let app = TestApp::with_config(config).await;
    let email = unique_email("jane");
    app.user(&email, &[]).await;

    let (first, _) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": "wrong-guess" }))
        .await;
    assert_eq!(first, StatusCode::UNAUTHORIZED);

    let before = app.store.calls();
    let (second, body) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
        .await;

    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Too many"));
    assert_eq!(app.store.calls(), before);
}

#[tokio::test]
async fn test_throttle_is_per_identifier() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        login_per_minute: 1,
        login_burst: 1,
    };
    let app = TestApp::with_config(config).await;
    let throttled = unique_email("jane");
    let other = unique_email("john");
    app.user(&throttled, &[]).await;
    app.user(&other, &[]).await;

    app.login(&throttled).await;
    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": throttled, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    app.login(&other).await;
}

#[tokio::test]
async fn test_login_during_outage_is_internal_error() {
    let app = TestApp::new().await;
    let email = unique_email("jane");
    app.user(&email, &[]).await;
    app.store.set_unavailable(true);

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_me_reports_held_permissions() {
    let app = TestApp::new().await;
    let role = app.role("reader", &["lecture_view", "event_list"]).await;
    let email = unique_email("jane");
    app.user(&email, &[role]).await;
    let token = app.login(&email).await;

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guard"], "user");
    assert_eq!(body["is_system_bypass"], false);
    assert_eq!(body["permissions"], json!(["event_list", "lecture_view"]));
}

#[tokio::test]
async fn test_me_for_admin_is_bypass() {
    let app = TestApp::new().await;
    let email = unique_email("root");
    app.admin(&email).await;
    let token = app.login(&email).await;

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guard"], "admin");
    assert_eq!(body["is_system_bypass"], true);
    assert_eq!(body["permissions"], json!([]));
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/auth/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/auth/me", Some("not.a.jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_token_of_removed_institute_is_unresolvable() {
    let app = TestApp::new().await;
    let email = unique_email("registrar");
    let institute = app.institute(&email, None).await;
    let token = app.login(&email).await;
    app.store.remove_institute(institute.id).await;

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
    assert!(body["error"].as_str().unwrap().contains("sign in again"));
}
