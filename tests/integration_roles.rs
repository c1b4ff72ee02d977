mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{TestApp, unique_email};

async fn admin_token(app: &TestApp) -> String {
    let email = unique_email("root");
    app.admin(&email).await;
    app.login(&email).await
}

async fn permission_ids(app: &TestApp, keys: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for key in keys {
        ids.push(app.store.permission_id(key).await.unwrap().to_string());
    }
    ids
}

fn keys_of(role: &Value) -> Vec<String> {
    role["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["permission_key"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_role_lifecycle() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let ids = permission_ids(&app, &["lecture_view", "lecture_list"]).await;

    let (status, created) = app
        .post(
            "/api/roles",
            Some(&token),
            json!({ "role_name": "Teaching Assistant", "permission_ids": ids }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role_key"], "teaching_assistant");
    assert_eq!(keys_of(&created), vec!["lecture_list", "lecture_view"]);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = app.get(&format!("/api/roles/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["role_name"], "Teaching Assistant");

    let (status, updated) = app
        .put(
            &format!("/api/roles/{}", id),
            Some(&token),
            json!({ "role_description": "Helps run lectures" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role_description"], "Helps run lectures");
    assert_eq!(keys_of(&updated).len(), 2);

    let (status, _) = app.delete(&format!("/api/roles/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/roles/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_replaces_permissions() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let role = app.role("reader", &["lecture_view", "event_view"]).await;
    let ids = permission_ids(&app, &["student_list"]).await;

    let (status, body) = app
        .put(
            &format!("/api/roles/{}/permissions", role),
            Some(&token),
            json!({ "permission_ids": ids }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys_of(&body), vec!["student_list"]);
}

#[tokio::test]
async fn test_unknown_permission_id_is_bad_request() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let (status, _) = app
        .post(
            "/api/roles",
            Some(&token),
            json!({ "role_name": "Broken", "permission_ids": [uuid::Uuid::new_v4()] }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_role_fields_are_reported_by_name() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let (status, body) = app
        .post(
            "/api/roles",
            Some(&token),
            json!({ "role_name": "", "role_description": "x".repeat(501) }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["fields"],
        json!({
            "role_description": ["Description must not exceed 500 characters"],
            "role_name": ["Role name must be between 1 and 100 characters"],
        })
    );
}

#[tokio::test]
async fn test_duplicate_role_key_conflicts() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    app.role("tutor", &[]).await;

    let (status, _) = app
        .post("/api/roles", Some(&token), json!({ "role_name": "Tutor" }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_roles_searches_and_paginates() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    for key in ["lab_tutor", "lab_manager", "registrar"] {
        app.role(key, &[]).await;
    }

    let (status, body) = app.get("/api/roles?search=lab&limit=1", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["has_more"], true);
}

#[tokio::test]
async fn test_catalog_groups_keys_by_module() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let (status, body) = app.get("/api/permissions/catalog", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let modules = body["modules"].as_array().unwrap();
    let lecture = modules
        .iter()
        .find(|m| m["module"] == "lecture")
        .unwrap();
    let keys: Vec<&str> = lecture["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"lecture_list"));
    assert!(keys.contains(&"lecture_view"));
}

#[tokio::test]
async fn test_permissions_list_returns_stored_rows() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let (status, body) = app.get("/api/permissions", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert!(rows.iter().any(|p| p["permission_key"] == "role_assign"));
}

#[tokio::test]
async fn test_assign_user_roles_replaces_set() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let first = app.role("first", &[]).await;
    let second = app.role("second", &[]).await;
    let user = app.user(&unique_email("jane"), &[first]).await;

    let (status, body) = app
        .put(
            &format!("/api/users/{}/roles", user.id),
            Some(&token),
            json!({ "role_ids": [second] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"].as_array().unwrap().len(), 1);
    assert_eq!(body["roles"][0]["role_key"], "second");

    let (status, body) = app
        .get(&format!("/api/users/{}/roles", user.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"][0]["role_key"], "second");
}

#[tokio::test]
async fn test_assign_roles_to_unknown_user_is_404() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let (status, _) = app
        .put(
            &format!("/api/users/{}/roles", uuid::Uuid::new_v4()),
            Some(&token),
            json!({ "role_ids": [] }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_assign_alias_grants_assignment() {
    let app = TestApp::new().await;
    let assigner = app.role("assigner", &["role_assign"]).await;
    let target = app.role("target", &[]).await;
    let email = unique_email("manager");
    app.user(&email, &[assigner]).await;
    let token = app.login(&email).await;
    let user = app.user(&unique_email("jane"), &[]).await;

    let (status, _) = app
        .put(
            &format!("/api/users/{}/roles", user.id),
            Some(&token),
            json!({ "role_ids": [target] }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
}
