//! JWT (JSON Web Token) utilities for authentication.
//!
//! Tokens are HS256 signed with `JWT_SECRET` and carry the audience of the
//! guard that minted them. Verification is always against one guard: the
//! signature, expiry and audience must validate, and the embedded principal
//! kind must be one that guard admits.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use lectern_config::JwtConfig;
use lectern_core::AppError;

use crate::claims::{Claims, Guard, PrincipalKind};

/// Creates an access token for `subject` under `guard`.
///
/// # Errors
///
/// Returns an error if `kind` is not admitted by `guard`, or if encoding fails.
///
/// # Example
///
/// ```ignore
/// let token = create_access_token(
///     Guard::User,
///     shadow_user_id,
///     "registrar@northfield.edu",
///     PrincipalKind::Institute,
///     &jwt_config,
/// )?;
/// ```
pub fn create_access_token(
    guard: Guard,
    subject: Uuid,
    email: &str,
    kind: PrincipalKind,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    if !guard.admits(kind) {
        return Err(AppError::internal_error(format!(
            "Guard {} cannot issue tokens for {} principals",
            guard, kind
        )));
    }

    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: subject.to_string(),
        email: email.to_string(),
        kind,
        aud: guard.audience(jwt_config).to_string(),
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Verifies a token against a single guard and returns its claims.
///
/// # Errors
///
/// Returns an unauthorized error if:
/// - The token signature is invalid
/// - The token has expired
/// - The audience belongs to another guard
/// - The principal kind is not admitted by `guard`
pub fn verify_token(token: &str, guard: Guard, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.set_audience(&[guard.audience(jwt_config)]);
    validation.set_required_spec_claims(&["exp", "aud"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))?;

    if !guard.admits(claims.kind) {
        return Err(AppError::unauthorized("Invalid or expired token".to_string()));
    }

    Ok(claims)
}
