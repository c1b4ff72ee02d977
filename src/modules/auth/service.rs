use tracing::{instrument, warn};

use lectern_authz::{AuthFailure, AuthzError};
use lectern_core::AppError;
use lectern_models::{LoginRequest, LoginResponse, MeResponse};

use crate::middleware::auth::AuthPrincipal;
use crate::state::AppState;

pub struct AuthService;

impl AuthService {
    /// Throttles per identifier, then hands the credentials to the selector.
    ///
    /// A throttled attempt never reaches a credential store.
    #[instrument(skip(state, dto))]
    pub async fn login(state: &AppState, dto: LoginRequest) -> Result<LoginResponse, AppError> {
        let identifier = dto.email.trim().to_lowercase();

        if state.login_limiter.check_key(&identifier).is_err() {
            warn!("Login attempt throttled");
            return Err(AppError::too_many_requests(
                "Too many login attempts, please try again later".to_string(),
            ));
        }

        let authenticated = state
            .selector
            .authenticate(&identifier, &dto.password)
            .await
            .map_err(AuthFailure::into_app_error)?;

        Ok(LoginResponse {
            kind: authenticated.kind(),
            profile: authenticated.principal.display_profile(),
            access_token: authenticated.token,
            token_type: "Bearer".to_string(),
            expires_in: authenticated.expires_in,
            guard: authenticated.guard,
        })
    }

    #[instrument(skip_all, fields(kind = %principal.principal().kind()))]
    pub async fn me(state: &AppState, principal: &AuthPrincipal) -> Result<MeResponse, AuthzError> {
        let held = state.gate.resolver().held_permissions(&principal.0).await?;

        Ok(MeResponse {
            guard: principal.guard(),
            profile: principal.principal().display_profile(),
            permissions: held.into_iter().collect(),
            is_system_bypass: principal.0.is_system_bypass(),
        })
    }
}
