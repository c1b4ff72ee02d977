use std::env;

/// Token signing settings.
///
/// Each guard gets its own audience claim so a token minted for the user guard
/// can never validate against the admin guard, even though both share a secret.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub admin_audience: String,
    pub user_audience: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            access_token_expiry: env::var("JWT_ACCESS_EXPIRY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600), // 1 hour
            admin_audience: env::var("JWT_ADMIN_AUDIENCE")
                .unwrap_or_else(|_| "lectern-admin".to_string()),
            user_audience: env::var("JWT_USER_AUDIENCE")
                .unwrap_or_else(|_| "lectern-user".to_string()),
        }
    }

    /// Fixed values for tests and local tooling.
    pub fn for_testing(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            access_token_expiry: 3600,
            admin_audience: "lectern-admin".to_string(),
            user_audience: "lectern-user".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_testing_uses_distinct_audiences() {
        let config = JwtConfig::for_testing("secret");
        assert_eq!(config.secret, "secret");
        assert_ne!(config.admin_audience, config.user_audience);
    }
}
