use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use lectern_auth::Guard;
use lectern_authz::{AuthContext, AuthzError};
use lectern_models::{InstituteId, Principal};

use crate::state::AppState;

/// Extractor that validates the bearer token against the guards in precedence
/// order and loads the principal it names.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub AuthContext);

impl AuthPrincipal {
    pub fn principal(&self) -> &Principal {
        &self.0.principal
    }

    pub fn guard(&self) -> Guard {
        self.0.guard
    }

    /// The institute an institute or faculty principal is confined to.
    pub fn institute_scope(&self) -> Option<InstituteId> {
        self.0.principal.institute_scope()
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthzError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthzError::Unauthenticated)
}

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AuthzError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let (guard, claims) = state
            .selector
            .validate_token(token, &Guard::PRECEDENCE)
            .map_err(|_| AuthzError::Unauthenticated)?;

        let ctx = state.gate.establish(guard, &claims).await?;
        Ok(AuthPrincipal(ctx))
    }
}

/// Declares an extractor that lets the request through only when the gate
/// grants every listed permission.
///
/// Identifiers may be canonical keys or registered aliases.
#[macro_export]
macro_rules! require_permissions {
    ($name:ident, [$($permission:literal),+ $(,)?]) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthPrincipal);

        impl $name {
            pub const PERMISSIONS: &'static [&'static str] = &[$($permission),+];
        }

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = lectern_authz::AuthzError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let extracted = <$crate::middleware::auth::AuthPrincipal as axum::extract::FromRequestParts<
                    $crate::state::AppState,
                >>::from_request_parts(parts, state)
                .await;
                let principal = match extracted {
                    Ok(principal) => Some(principal),
                    Err(lectern_authz::AuthzError::Unauthenticated) => None,
                    Err(err) => return Err(err),
                };

                state
                    .gate
                    .authorize(principal.as_ref().map(|p| &p.0), Self::PERMISSIONS)
                    .await?;

                principal
                    .map($name)
                    .ok_or(lectern_authz::AuthzError::Unauthenticated)
            }
        }
    };
}

// Roles
require_permissions!(RequireRoleCreate, ["role_create"]);
require_permissions!(RequireRoleList, ["role_list"]);
require_permissions!(RequireRoleView, ["role_view"]);
require_permissions!(RequireRoleUpdate, ["role_update"]);
require_permissions!(RequireRoleDelete, ["role_delete"]);
require_permissions!(RequireRoleAssign, ["roles:assign"]);

// Permissions
require_permissions!(RequirePermissionList, ["permission_list"]);
require_permissions!(RequirePermissionSync, ["permission_sync", "role_update"]);

// Institutes
require_permissions!(RequireInstituteCreate, ["institute_create"]);
require_permissions!(RequireInstituteList, ["institute_list"]);
require_permissions!(RequireInstituteView, ["institute_view"]);
require_permissions!(RequireInstituteUpdate, ["institute_update"]);

// Faculties
require_permissions!(RequireFacultyCreate, ["faculty_create"]);
require_permissions!(RequireFacultyList, ["faculties:list"]);
require_permissions!(RequireFacultyView, ["faculty_view"]);
require_permissions!(RequireFacultyUpdate, ["faculty_update"]);
