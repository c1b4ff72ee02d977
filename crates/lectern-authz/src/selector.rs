//! Login across the four identity tables and bearer-token guard checks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use lectern_auth::{Claims, Guard, PrincipalKind, create_access_token, verify_token};
use lectern_config::{AuthzConfig, JwtConfig};
use lectern_core::{AppError, verify_password};
use lectern_db::{CredentialStore, ShadowUser, StoreError};
use lectern_models::{FacultyPrincipal, InstitutePrincipal, Principal};
use lectern_observability::{
    track_login_failure, track_login_success, track_shadow_sync, track_token_issued,
    track_token_validation,
};

/// A successful login.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub principal: Principal,
    pub guard: Guard,
    pub token: String,
    pub expires_in: i64,
}

impl Authenticated {
    pub fn kind(&self) -> PrincipalKind {
        self.principal.kind()
    }
}

#[derive(Debug, Error)]
pub enum AuthFailure {
    /// Same message whichever store came closest to matching.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("authentication backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AuthFailure {
    fn from(err: StoreError) -> Self {
        AuthFailure::Backend(err.to_string())
    }
}

impl AuthFailure {
    /// Backend details are logged, never returned.
    pub fn into_app_error(self) -> AppError {
        match self {
            AuthFailure::InvalidCredentials | AuthFailure::InvalidToken => {
                AppError::unauthorized(self.to_string())
            }
            AuthFailure::Backend(detail) => {
                tracing::error!(%detail, "Authentication backend failure");
                AppError::internal_error("Internal server error".to_string())
            }
        }
    }
}

/// Tries credential stores in a fixed order and issues guard-scoped tokens.
#[derive(Clone)]
pub struct Selector {
    credentials: Arc<dyn CredentialStore>,
    jwt_config: JwtConfig,
    store_timeout: Duration,
}

impl Selector {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        jwt_config: JwtConfig,
        config: &AuthzConfig,
    ) -> Self {
        Self {
            credentials,
            jwt_config,
            store_timeout: config.store_timeout,
        }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, AuthFailure>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(AuthFailure::from),
            Err(_) => Err(AuthFailure::Backend(format!(
                "credential store call exceeded {:?}",
                self.store_timeout
            ))),
        }
    }

    /// Admin, then institute, then faculty, then generic user.
    ///
    /// The first store whose record accepts `secret` wins. Institute and
    /// faculty logins refresh their shadow user row and receive a user-guard
    /// token whose subject is that row.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Authenticated, AuthFailure> {
        let identifier = identifier.trim();

        let result = self.try_stores(identifier, secret).await;
        match &result {
            Ok(authenticated) => {
                info!(kind = %authenticated.kind(), guard = %authenticated.guard, "Login succeeded");
                track_login_success(authenticated.kind().as_str());
            }
            Err(AuthFailure::InvalidCredentials) => {
                info!("Login rejected");
                track_login_failure("invalid_credentials");
            }
            Err(_) => track_login_failure("backend"),
        }
        result
    }

    async fn try_stores(&self, identifier: &str, secret: &str) -> Result<Authenticated, AuthFailure> {
        if let Some(admin) = self
            .bounded(self.credentials.find_admin_by_email(identifier))
            .await?
            && admin.principal.is_active
            && password_matches(secret, &admin.password_hash)
        {
            let id = admin.principal.id.into_inner();
            return self.issue(Guard::Admin, id, Principal::Admin(admin.principal));
        }

        if let Some(record) = self
            .bounded(self.credentials.find_active_institute_by_email(identifier))
            .await?
            && password_matches(secret, &record.password_hash)
        {
            let institute = record.institute;
            let shadow_user_id = self.sync_shadow(&ShadowUser::of_institute(&institute)).await?;
            let principal = Principal::Institute(InstitutePrincipal {
                id: institute.id,
                name: institute.name,
                email: institute.email,
                mobile: institute.mobile,
                is_active: institute.is_active,
                role_id: institute.role_id,
                role_revoked_at: record.role_revoked_at,
                shadow_user_id,
            });
            return self.issue(Guard::User, shadow_user_id.into_inner(), principal);
        }

        if let Some(record) = self
            .bounded(self.credentials.find_active_faculty_by_email(identifier))
            .await?
            && password_matches(secret, &record.password_hash)
        {
            let faculty = record.faculty;
            let shadow_user_id = self.sync_shadow(&ShadowUser::of_faculty(&faculty)).await?;
            let principal = Principal::Faculty(FacultyPrincipal {
                id: faculty.id,
                institute_id: faculty.institute_id,
                department_id: faculty.department_id,
                name: faculty.name,
                email: faculty.email,
                mobile: faculty.mobile,
                is_active: faculty.is_active,
                role_id: faculty.role_id,
                role_revoked_at: record.role_revoked_at,
                shadow_user_id,
            });
            return self.issue(Guard::User, shadow_user_id.into_inner(), principal);
        }

        if let Some(user) = self
            .bounded(self.credentials.find_user_by_email(identifier))
            .await?
            && user.principal.is_active
            && password_matches(secret, &user.password_hash)
        {
            let id = user.principal.id.into_inner();
            return self.issue(Guard::User, id, Principal::User(user.principal));
        }

        Err(AuthFailure::InvalidCredentials)
    }

    async fn sync_shadow(&self, shadow: &ShadowUser) -> Result<lectern_models::UserId, AuthFailure> {
        let id = self
            .bounded(self.credentials.upsert_shadow_user(shadow))
            .await?;
        track_shadow_sync(shadow.source_kind.as_str());
        Ok(id)
    }

    fn issue(
        &self,
        guard: Guard,
        subject: Uuid,
        principal: Principal,
    ) -> Result<Authenticated, AuthFailure> {
        let token = create_access_token(
            guard,
            subject,
            principal.email(),
            principal.kind(),
            &self.jwt_config,
        )
        .map_err(|e| AuthFailure::Backend(e.error.to_string()))?;
        track_token_issued(guard.as_str());

        Ok(Authenticated {
            principal,
            guard,
            token,
            expires_in: self.jwt_config.access_token_expiry,
        })
    }

    /// Returns the first guard in `guards` that accepts `token`, with its claims.
    ///
    /// Acceptance covers signature, expiry and the guard's audience.
    pub fn validate_token(
        &self,
        token: &str,
        guards: &[Guard],
    ) -> Result<(Guard, Claims), AuthFailure> {
        let accepted = guards.iter().find_map(|&guard| {
            verify_token(token, guard, &self.jwt_config)
                .ok()
                .map(|claims| (guard, claims))
        });
        track_token_validation(accepted.is_some());
        accepted.ok_or(AuthFailure::InvalidToken)
    }
}

/// A malformed stored hash counts as a mismatch.
fn password_matches(secret: &str, hash: &str) -> bool {
    verify_password(secret, hash).unwrap_or_else(|_| {
        warn!("Stored password hash could not be verified");
        false
    })
}
