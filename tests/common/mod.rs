#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use lectern::router::init_router;
use lectern::state::{AppConfig, AppState};
use lectern_config::{AuthzConfig, CorsConfig, JwtConfig, RateLimitConfig};
use lectern_core::hash_password;
use lectern_db::{
    AccountStore, DirectoryStore, MemoryStore, NewAdmin, NewFaculty, NewInstitute, NewRole,
    NewUser, RoleStore,
};
use lectern_models::{AdminType, Faculty, Institute, InstituteId, RoleId, UserPrincipal, UserType};

pub const PASSWORD: &str = "password123";

/// A router over an in-memory store, plus the store for arranging fixtures.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    password_hash: String,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt: JwtConfig::for_testing("integration-test-secret"),
        cors: CorsConfig::from_list("http://localhost:5173"),
        rate_limit: RateLimitConfig {
            login_per_minute: 60,
            login_burst: 20,
        },
        authz: AuthzConfig {
            store_timeout: Duration::from_millis(200),
        },
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::with_catalog().await);
        let router = init_router(AppState::new(store.clone(), config).unwrap());
        Self {
            store,
            router,
            password_hash: hash_password(PASSWORD).unwrap(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("PUT", uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, token, None)).await
    }

    /// Logs in and returns the access token, failing the test on anything but 200.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {email}: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn role(&self, role_key: &str, keys: &[&str]) -> RoleId {
        let mut permission_ids = Vec::new();
        for key in keys {
            permission_ids.push(self.store.permission_id(key).await.unwrap());
        }
        self.store
            .create_role(NewRole {
                role_name: role_key.to_string(),
                role_key: role_key.to_string(),
                role_description: None,
                is_default: false,
                permission_ids,
            })
            .await
            .unwrap()
            .role
            .id
    }

    pub async fn admin(&self, email: &str) {
        self.store
            .create_admin(NewAdmin {
                name: "Platform Root".to_string(),
                email: email.to_string(),
                password_hash: self.password_hash.clone(),
                user_type: AdminType::SuperAdmin,
            })
            .await
            .unwrap();
    }

    pub async fn user(&self, email: &str, roles: &[RoleId]) -> UserPrincipal {
        self.user_of_type(email, UserType::Default, roles).await
    }

    pub async fn user_of_type(
        &self,
        email: &str,
        user_type: UserType,
        roles: &[RoleId],
    ) -> UserPrincipal {
        let user = self
            .store
            .create_user(NewUser {
                name: "Jane Learner".to_string(),
                email: email.to_string(),
                password_hash: self.password_hash.clone(),
                user_type,
                email_verified: true,
            })
            .await
            .unwrap();
        self.store.assign_user_roles(user.id, roles).await.unwrap();
        user
    }

    pub async fn institute(&self, email: &str, role_id: Option<RoleId>) -> Institute {
        self.store
            .create_institute(NewInstitute {
                name: "Northfield College".to_string(),
                email: email.to_string(),
                mobile: Some("+15550100".to_string()),
                password_hash: self.password_hash.clone(),
                role_id,
            })
            .await
            .unwrap()
    }

    pub async fn faculty(
        &self,
        institute_id: InstituteId,
        email: &str,
        role_id: Option<RoleId>,
    ) -> Faculty {
        self.store
            .create_faculty(NewFaculty {
                institute_id,
                department_id: None,
                name: "Dr. Ada".to_string(),
                email: email.to_string(),
                mobile: None,
                password_hash: self.password_hash.clone(),
                role_id,
            })
            .await
            .unwrap()
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.edu", prefix, Uuid::new_v4().simple())
}
