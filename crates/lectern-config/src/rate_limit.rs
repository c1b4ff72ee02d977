//! Login throttling configuration.
//!
//! Login attempts are limited per identifier (the submitted email) using the
//! Governor crate's keyed token bucket:
//!
//! - Tokens are replenished at `login_per_minute`
//! - Each attempt consumes one token
//! - `login_burst` is the most attempts that can be made back to back
//!
//! # Configuration
//!
//! - `RATE_LIMIT_LOGIN_PER_MINUTE`: attempts per minute per identifier (default: 10)
//! - `RATE_LIMIT_LOGIN_BURST`: burst size per identifier (default: 5)
//!
//! # Example
//!
//! ```ignore
//! use lectern_config::RateLimitConfig;
//!
//! let limiter = RateLimitConfig::from_env().login_limiter();
//! if limiter.check_key(&"jane@example.com".to_string()).is_err() {
//!     // 429
//! }
//! ```

use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

/// Keyed limiter shared by all login requests.
pub type LoginRateLimiter = DefaultKeyedRateLimiter<String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Replenishment rate for each identifier's bucket.
    pub login_per_minute: u32,

    /// Maximum tokens an identifier's bucket can hold.
    pub login_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_per_minute: 10,
            login_burst: 5,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new `RateLimitConfig` from environment variables.
    ///
    /// Falls back to default values if environment variables are not set
    /// or cannot be parsed.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            login_per_minute: std::env::var("RATE_LIMIT_LOGIN_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.login_per_minute),
            login_burst: std::env::var("RATE_LIMIT_LOGIN_BURST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.login_burst),
        }
    }

    /// The per-identifier quota. Zero values are raised to one.
    #[must_use]
    pub fn login_quota(&self) -> Quota {
        let per_minute = NonZeroU32::new(self.login_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.login_burst).unwrap_or(NonZeroU32::MIN);
        Quota::per_minute(per_minute).allow_burst(burst)
    }

    #[must_use]
    pub fn login_limiter(&self) -> LoginRateLimiter {
        RateLimiter::keyed(self.login_quota())
    }
}
