//! JWT claim structures and the guard vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use lectern_config::JwtConfig;

/// A named token-validation strategy.
///
/// Guards are tried in [`Guard::PRECEDENCE`] order when a request presents a
/// bearer token; the first one that validates wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    Admin,
    User,
}

impl Guard {
    pub const PRECEDENCE: [Guard; 2] = [Guard::Admin, Guard::User];

    pub const fn as_str(self) -> &'static str {
        match self {
            Guard::Admin => "admin",
            Guard::User => "user",
        }
    }

    pub fn audience(self, jwt_config: &JwtConfig) -> &str {
        match self {
            Guard::Admin => &jwt_config.admin_audience,
            Guard::User => &jwt_config.user_audience,
        }
    }

    /// Whether tokens of this guard may carry a principal of `kind`.
    pub const fn admits(self, kind: PrincipalKind) -> bool {
        matches!(
            (self, kind),
            (Guard::Admin, PrincipalKind::Admin)
                | (
                    Guard::User,
                    PrincipalKind::Institute | PrincipalKind::Faculty | PrincipalKind::User
                )
        )
    }

    /// The guard that issues tokens for `kind`.
    pub const fn for_kind(kind: PrincipalKind) -> Guard {
        match kind {
            PrincipalKind::Admin => Guard::Admin,
            PrincipalKind::Institute | PrincipalKind::Faculty | PrincipalKind::User => Guard::User,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which identity table a principal was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Admin,
    Institute,
    Faculty,
    User,
}

impl PrincipalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            PrincipalKind::Admin => "admin",
            PrincipalKind::Institute => "institute",
            PrincipalKind::Faculty => "faculty",
            PrincipalKind::User => "user",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims for access tokens.
///
/// Claims identify the principal only. Permissions are never embedded; they
/// are resolved from the role graph on every request.
///
/// # Fields
///
/// - `sub`: Admin id for admin tokens, otherwise the (shadow) user id
/// - `email`: Email at the time of login
/// - `kind`: Identity table the login matched
/// - `aud`: Audience of the issuing guard
/// - `exp` / `iat`: Expiry and issue timestamps
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject id
    pub sub: String,
    /// Email address
    pub email: String,
    /// Principal kind
    pub kind: PrincipalKind,
    /// Audience of the issuing guard
    pub aud: String,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialize() {
        let claims = Claims {
            sub: "user-id-123".to_string(),
            email: "test@example.com".to_string(),
            kind: PrincipalKind::Institute,
            aud: "lectern-user".to_string(),
            exp: 1234567890,
            iat: 1234567800,
        };
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(serialized.contains(r#""sub":"user-id-123""#));
        assert!(serialized.contains(r#""kind":"institute""#));
        assert!(serialized.contains(r#""aud":"lectern-user""#));
    }

    #[test]
    fn test_claims_deserialize() {
        let json = r#"{"sub":"abc","email":"a@b.c","kind":"admin","aud":"lectern-admin","exp":9999999999,"iat":9999999900}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.kind, PrincipalKind::Admin);
        assert_eq!(claims.exp, 9999999999);
    }

    #[test]
    fn test_guard_admits_only_its_kinds() {
        assert!(Guard::Admin.admits(PrincipalKind::Admin));
        assert!(!Guard::Admin.admits(PrincipalKind::User));
        assert!(!Guard::Admin.admits(PrincipalKind::Institute));
        assert!(Guard::User.admits(PrincipalKind::Faculty));
        assert!(Guard::User.admits(PrincipalKind::User));
        assert!(!Guard::User.admits(PrincipalKind::Admin));
    }

    #[test]
    fn test_for_kind_is_consistent_with_admits() {
        for kind in [
            PrincipalKind::Admin,
            PrincipalKind::Institute,
            PrincipalKind::Faculty,
            PrincipalKind::User,
        ] {
            assert!(Guard::for_kind(kind).admits(kind));
        }
    }

    #[test]
    fn test_guard_audience() {
        let config = JwtConfig::for_testing("secret");
        assert_eq!(Guard::Admin.audience(&config), "lectern-admin");
        assert_eq!(Guard::User.audience(&config), "lectern-user");
    }
}
