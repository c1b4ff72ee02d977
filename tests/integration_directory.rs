mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{PASSWORD, TestApp, unique_email};

async fn institute_token(app: &TestApp, keys: &[&str]) -> (lectern_models::Institute, String) {
    let role = app
        .role(&format!("institute-{}", uuid::Uuid::new_v4().simple()), keys)
        .await;
    let email = unique_email("registrar");
    let institute = app.institute(&email, Some(role)).await;
    let token = app.login(&email).await;
    (institute, token)
}

#[tokio::test]
async fn test_admin_creates_institute_that_can_log_in() {
    let app = TestApp::new().await;
    let email = unique_email("root");
    app.admin(&email).await;
    let token = app.login(&email).await;
    let institute_email = unique_email("registrar");

    let (status, body) = app
        .post(
            "/api/institutes",
            Some(&token),
            json!({
                "name": "Harbor Polytechnic",
                "email": institute_email.to_uppercase(),
                "mobile": "+15550199",
                "password": PASSWORD,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], institute_email);
    assert!(body.get("password_hash").is_none());

    let (status, login) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": institute_email, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["kind"], "institute");
}

#[tokio::test]
async fn test_institute_sees_only_itself() {
    let app = TestApp::new().await;
    app.institute(&unique_email("other"), None).await;
    let (own, token) = institute_token(&app, &["institute_list", "institute_view"]).await;

    let (status, body) = app.get("/api/institutes", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], own.id.to_string());
}

#[tokio::test]
async fn test_other_institute_is_not_found_for_scoped_caller() {
    let app = TestApp::new().await;
    let other = app.institute(&unique_email("other"), None).await;
    let (_, token) = institute_token(&app, &["institute_view"]).await;

    let (status, _) = app
        .get(&format!("/api/institutes/{}", other.id), Some(&token))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_institute_creates_faculty_in_own_institute() {
    let app = TestApp::new().await;
    let (own, token) = institute_token(&app, &["faculty_create", "faculty_list"]).await;
    let faculty_email = unique_email("dean");

    let (status, body) = app
        .post(
            "/api/faculties",
            Some(&token),
            json!({ "name": "Dr. Grace", "email": faculty_email, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["institute_id"], own.id.to_string());

    let (status, body) = app.get("/api/faculties", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
}

#[tokio::test]
async fn test_cross_institute_faculty_creation_is_forbidden() {
    let app = TestApp::new().await;
    let other = app.institute(&unique_email("other"), None).await;
    let (_, token) = institute_token(&app, &["faculty_create"]).await;

    let (status, body) = app
        .post(
            "/api/faculties",
            Some(&token),
            json!({
                "institute_id": other.id,
                "name": "Dr. Grace",
                "email": unique_email("dean"),
                "password": PASSWORD,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("own institute"));
}

#[tokio::test]
async fn test_admin_must_name_institute_for_faculty() {
    let app = TestApp::new().await;
    let email = unique_email("root");
    app.admin(&email).await;
    let token = app.login(&email).await;

    let (status, _) = app
        .post(
            "/api/faculties",
            Some(&token),
            json!({ "name": "Dr. Grace", "email": unique_email("dean"), "password": PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_directory_payloads_are_reported_by_field() {
    let app = TestApp::new().await;
    let email = unique_email("root");
    app.admin(&email).await;
    let token = app.login(&email).await;

    let (status, body) = app
        .post(
            "/api/institutes",
            Some(&token),
            json!({ "name": "Harbor Polytechnic", "email": "harbor", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["fields"],
        json!({
            "email": ["Invalid email address"],
            "password": ["Password must be at least 8 characters"],
        })
    );

    let institute = app.institute(&unique_email("registrar"), None).await;
    let (status, body) = app
        .post(
            "/api/faculties",
            Some(&token),
            json!({
                "institute_id": institute.id,
                "name": "Dr. Grace",
                "email": unique_email("dean"),
                "mobile": "123",
                "password": PASSWORD,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["fields"],
        json!({ "mobile": ["Mobile must be between 5 and 20 characters"] })
    );
}

#[tokio::test]
async fn test_faculty_list_filter_cannot_escape_scope() {
    let app = TestApp::new().await;
    let other = app.institute(&unique_email("other"), None).await;
    app.faculty(other.id, &unique_email("outsider"), None).await;
    let (_, token) = institute_token(&app, &["faculty_list"]).await;

    let (status, body) = app
        .get(&format!("/api/faculties?institute_id={}", other.id), Some(&token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn test_faculty_role_link_drives_permissions() {
    let app = TestApp::new().await;
    let (own, institute) = institute_token(&app, &["faculty_update", "faculty_view"]).await;
    let lecturer = app.role("lecturer", &["lecture_list"]).await;
    let email = unique_email("dean");
    let faculty = app.faculty(own.id, &email, None).await;
    let faculty_token = app.login(&email).await;

    let (status, _) = app.get("/api/auth/me", Some(&faculty_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .put(
            &format!("/api/faculties/{}/role", faculty.id),
            Some(&institute),
            json!({ "role_id": lecturer }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role_id"], lecturer.to_string());

    let (status, body) = app.get("/api/auth/me", Some(&faculty_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"], json!(["lecture_list"]));
}

#[tokio::test]
async fn test_linking_unknown_role_is_bad_request() {
    let app = TestApp::new().await;
    let email = unique_email("root");
    app.admin(&email).await;
    let token = app.login(&email).await;
    let institute = app.institute(&unique_email("registrar"), None).await;

    let (status, _) = app
        .put(
            &format!("/api/institutes/{}/role", institute.id),
            Some(&token),
            json!({ "role_id": uuid::Uuid::new_v4() }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_faculty_cannot_manage_institutes() {
    let app = TestApp::new().await;
    let institute = app.institute(&unique_email("registrar"), None).await;
    let lecturer = app.role("lecturer", &["lecture_create", "lecture_list"]).await;
    let email = unique_email("dean");
    app.faculty(institute.id, &email, Some(lecturer)).await;
    let token = app.login(&email).await;

    let (status, body) = app.get("/api/institutes", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["required"], json!(["institute_list"]));
    assert_eq!(body["held"], json!(["lecture_create", "lecture_list"]));
}
