//! The enforcement chokepoint for protected routes.
//!
//! Routes declare permission identifiers (canonical keys or aliases). The gate
//! canonicalizes them, applies the admin bypass, asks the [`Resolver`], applies
//! the `_list` to `_view` fallback and turns every failure into an
//! [`AuthzError`] with a fixed status and reason code.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use lectern_auth::{Claims, Guard};
use lectern_core::{PermissionCatalog, PermissionKey};
use lectern_observability::track_authz_decision;

use crate::resolver::{AuthContext, Decision, ResolveError, Resolver};

/// Why a request was denied.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Session is no longer valid, please sign in again")]
    PrincipalUnresolvable,

    #[error("No valid permissions specified for this route")]
    InvalidPermissionDeclaration { declared: Vec<String> },

    #[error("Insufficient permissions")]
    InsufficientPermission {
        required: BTreeSet<PermissionKey>,
        held: BTreeSet<PermissionKey>,
    },

    /// Carries the internal cause for logging only.
    #[error("Internal server error")]
    StoreUnavailable(String),
}

impl AuthzError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthzError::Unauthenticated | AuthzError::PrincipalUnresolvable => {
                StatusCode::UNAUTHORIZED
            }
            AuthzError::InvalidPermissionDeclaration { .. }
            | AuthzError::InsufficientPermission { .. } => StatusCode::FORBIDDEN,
            AuthzError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated | AuthzError::PrincipalUnresolvable => "UNAUTHENTICATED",
            AuthzError::InvalidPermissionDeclaration { .. } => "NO_VALID_PERMISSIONS",
            AuthzError::InsufficientPermission { .. } => "INSUFFICIENT_PERMISSIONS",
            AuthzError::StoreUnavailable(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ResolveError> for AuthzError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::PrincipalUnresolvable { kind, subject } => {
                warn!(%kind, %subject, "Principal vanished during authorization");
                AuthzError::PrincipalUnresolvable
            }
            ResolveError::Store(_) | ResolveError::Timeout(_) => {
                error!(error = %err, "Authorization store failure");
                AuthzError::StoreUnavailable(err.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct DenialBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<Vec<PermissionKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    held: Option<Vec<PermissionKey>>,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (required, held) = match &self {
            AuthzError::InsufficientPermission { required, held } => (
                Some(required.iter().copied().collect()),
                Some(held.iter().copied().collect()),
            ),
            _ => (None, None),
        };
        let body = DenialBody {
            error: self.to_string(),
            code: self.code(),
            required,
            held,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Shared by every protected route through the application state.
#[derive(Clone)]
pub struct Gate {
    catalog: Arc<PermissionCatalog>,
    resolver: Resolver,
}

impl Gate {
    pub fn new(catalog: Arc<PermissionCatalog>, resolver: Resolver) -> Self {
        Self { catalog, resolver }
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Turns a validated token into the request's [`AuthContext`].
    ///
    /// A record that no longer exists is a stale session, and so is a token
    /// issued no later than the deletion of the principal's linked role. An
    /// inactive record is unauthenticated.
    pub async fn establish(&self, guard: Guard, claims: &Claims) -> Result<AuthContext, AuthzError> {
        let principal = self
            .resolver
            .load_principal(claims)
            .await?
            .ok_or(AuthzError::PrincipalUnresolvable)?;

        if let Some(revoked_at) = principal.role_revoked_at()
            && revoked_at.timestamp() >= claims.iat as i64
        {
            warn!(
                kind = %principal.kind(),
                subject = %claims.sub,
                %revoked_at,
                "Session predates deletion of its linked role"
            );
            return Err(AuthzError::PrincipalUnresolvable);
        }

        if !principal.is_active() {
            debug!(kind = %principal.kind(), "Rejecting inactive principal");
            return Err(AuthzError::Unauthenticated);
        }
        Ok(AuthContext::new(guard, principal))
    }

    /// Decides whether `ctx` may proceed past a route declaring `identifiers`.
    #[instrument(skip_all, fields(required = ?identifiers.iter().map(AsRef::as_ref).collect::<Vec<&str>>()))]
    pub async fn authorize<S: AsRef<str>>(
        &self,
        ctx: Option<&AuthContext>,
        identifiers: &[S],
    ) -> Result<Decision, AuthzError> {
        let result = self.evaluate(ctx, identifiers).await;
        match &result {
            Ok(decision) if decision.is_system_bypass => track_authz_decision("allow", "bypass"),
            Ok(_) => track_authz_decision("allow", "granted"),
            Err(err) => track_authz_decision("deny", err.code()),
        }
        result
    }

    async fn evaluate<S: AsRef<str>>(
        &self,
        ctx: Option<&AuthContext>,
        identifiers: &[S],
    ) -> Result<Decision, AuthzError> {
        if identifiers.is_empty() {
            return Ok(Decision::unrestricted());
        }

        let canonical = self.catalog.canonicalize_all(identifiers);
        if !canonical.dropped.is_empty() {
            warn!(dropped = ?canonical.dropped, "Route declares unknown permission identifiers");
        }

        let ctx = ctx.ok_or(AuthzError::Unauthenticated)?;

        if ctx.is_system_bypass() {
            return Ok(Decision::bypass());
        }

        if canonical.keys.is_empty() {
            return Err(AuthzError::InvalidPermissionDeclaration {
                declared: canonical.dropped,
            });
        }

        let mut decision = self.resolver.resolve(ctx, &canonical.keys).await?;
        if !decision.granted && satisfied_with_view_fallback(&canonical.keys, &decision.held) {
            debug!("Granted through list/view equivalence");
            decision.granted = true;
        }

        if !decision.granted {
            return Err(AuthzError::InsufficientPermission {
                required: canonical.keys,
                held: decision.held,
            });
        }
        Ok(decision)
    }
}

/// Every required key is held, or is a `_list` key whose `_view` is held.
fn satisfied_with_view_fallback(
    required: &BTreeSet<PermissionKey>,
    held: &BTreeSet<PermissionKey>,
) -> bool {
    required.iter().all(|key| {
        held.contains(key)
            || key
                .view_counterpart()
                .is_some_and(|view| held.contains(&view))
    })
}
