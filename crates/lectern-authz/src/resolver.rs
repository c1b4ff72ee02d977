//! Answers "does this principal hold these permission keys?".

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{instrument, warn};
use uuid::Uuid;

use lectern_auth::{Claims, Guard, PrincipalKind};
use lectern_config::AuthzConfig;
use lectern_core::PermissionKey;
use lectern_db::{IdentityStore, StoreError};
use lectern_models::{Principal, RoleId};

/// The validated guard and the principal it produced, for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub guard: Guard,
    pub principal: Principal,
}

impl AuthContext {
    pub fn new(guard: Guard, principal: Principal) -> Self {
        Self { guard, principal }
    }

    /// Platform admins authenticated through the admin guard skip the role graph.
    ///
    /// A generic user whose `user_type` is `super_admin` is not a bypass; it is
    /// resolved through its roles like any other user.
    pub fn is_system_bypass(&self) -> bool {
        self.guard == Guard::Admin && matches!(self.principal, Principal::Admin(_))
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decision {
    pub granted: bool,
    pub held: BTreeSet<PermissionKey>,
    pub is_system_bypass: bool,
}

impl Decision {
    /// Nothing was required.
    pub fn unrestricted() -> Self {
        Self {
            granted: true,
            ..Self::default()
        }
    }

    pub fn bypass() -> Self {
        Self {
            granted: true,
            held: BTreeSet::new(),
            is_system_bypass: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The principal, or the role it links to, disappeared after the token was issued.
    #[error("{kind} principal {subject} can no longer be resolved")]
    PrincipalUnresolvable { kind: PrincipalKind, subject: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("identity store call exceeded {0:?}")]
    Timeout(Duration),
}

/// Reads held permissions from the role graph.
#[derive(Clone)]
pub struct Resolver {
    identity: Arc<dyn IdentityStore>,
    store_timeout: Duration,
}

impl Resolver {
    pub fn new(identity: Arc<dyn IdentityStore>, config: &AuthzConfig) -> Self {
        Self {
            identity,
            store_timeout: config.store_timeout,
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ResolveError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(ResolveError::from),
            Err(_) => Err(ResolveError::Timeout(self.store_timeout)),
        }
    }

    /// Loads the principal a validated token names.
    ///
    /// `Ok(None)` when the record no longer exists or its subject is not an id.
    #[instrument(skip(self, claims), fields(kind = %claims.kind))]
    pub async fn load_principal(&self, claims: &Claims) -> Result<Option<Principal>, ResolveError> {
        let Ok(subject) = Uuid::parse_str(&claims.sub) else {
            warn!(sub = %claims.sub, "Token subject is not a uuid");
            return Ok(None);
        };
        self.bounded(self.identity.load_principal(claims.kind, subject))
            .await
    }

    /// Checks `required` against the principal's held set.
    ///
    /// Conjunctive: every required key must be held.
    #[instrument(skip(self, ctx), fields(kind = %ctx.principal.kind(), guard = %ctx.guard))]
    pub async fn resolve(
        &self,
        ctx: &AuthContext,
        required: &BTreeSet<PermissionKey>,
    ) -> Result<Decision, ResolveError> {
        if required.is_empty() {
            return Ok(Decision::unrestricted());
        }
        if ctx.is_system_bypass() {
            return Ok(Decision::bypass());
        }

        let held = self.held_permissions(ctx).await?;
        Ok(Decision {
            granted: required.is_subset(&held),
            held,
            is_system_bypass: false,
        })
    }

    /// The principal's held permission keys. Empty for bypassing admins.
    pub async fn held_permissions(
        &self,
        ctx: &AuthContext,
    ) -> Result<BTreeSet<PermissionKey>, ResolveError> {
        let stored = match &ctx.principal {
            Principal::Admin(_) => Vec::new(),
            Principal::User(user) => self
                .bounded(self.identity.user_permission_keys(user.id))
                .await?
                .ok_or(ResolveError::PrincipalUnresolvable {
                    kind: PrincipalKind::User,
                    subject: user.id.into_inner(),
                })?,
            Principal::Institute(institute) => {
                self.linked_role_keys(
                    PrincipalKind::Institute,
                    institute.id.into_inner(),
                    institute.role_id,
                )
                .await?
            }
            Principal::Faculty(faculty) => {
                self.linked_role_keys(
                    PrincipalKind::Faculty,
                    faculty.id.into_inner(),
                    faculty.role_id,
                )
                .await?
            }
        };

        Ok(parse_held(stored))
    }

    async fn linked_role_keys(
        &self,
        kind: PrincipalKind,
        subject: Uuid,
        role_id: Option<RoleId>,
    ) -> Result<Vec<String>, ResolveError> {
        let Some(role_id) = role_id else {
            return Ok(Vec::new());
        };
        self.bounded(self.identity.role_permission_keys(role_id))
            .await?
            .ok_or(ResolveError::PrincipalUnresolvable { kind, subject })
    }
}

/// Keeps catalog keys; anything else in the table is logged and ignored.
fn parse_held(stored: Vec<String>) -> BTreeSet<PermissionKey> {
    stored
        .into_iter()
        .filter_map(|raw| match raw.parse::<PermissionKey>() {
            Ok(key) => Some(key),
            Err(_) => {
                warn!(permission_key = %raw, "Ignoring stored permission outside the catalog");
                None
            }
        })
        .collect()
}
