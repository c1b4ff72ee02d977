//! Authorization gate settings.

use std::env;
use std::time::Duration;

/// Settings for the permission resolver and gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthzConfig {
    /// Upper bound for a single identity store call made while authorizing.
    ///
    /// A call that exceeds it is a denial with an internal-error reason.
    pub store_timeout: Duration,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(2000),
        }
    }
}

impl AuthzConfig {
    /// Reads `AUTHZ_STORE_TIMEOUT_MS` (default 2000). Zero is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        env::var("AUTHZ_STORE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(|ms| Self {
                store_timeout: Duration::from_millis(ms),
            })
            .unwrap_or_default()
    }
}
