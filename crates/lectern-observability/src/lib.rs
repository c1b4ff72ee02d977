//! Lectern Observability Module
//!
//! Provides configurable observability features including:
//! - Tracing and distributed tracing via OpenTelemetry
//! - Metrics collection via Prometheus
//! - HTTP request/response logging
//!
//! Compiled in with the `observability` feature and switched off at runtime with
//! `OBSERVABILITY_ENABLED=false`. Without the feature every function below is a
//! no-op with the same signature.
//!
//! ```no_run
//! use lectern_observability::{init_tracing, shutdown_tracer};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing();
//!     // ... application code ...
//!     shutdown_tracer().await;
//! }
//! ```

#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, is_observability_enabled, logging_middleware, shutdown_tracer};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, metrics_app, metrics_middleware, track_authz_decision, track_login_failure,
    track_login_success, track_shadow_sync, track_token_issued, track_token_validation,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{extract::Request, middleware::Next, response::Response};

    pub fn is_observability_enabled() -> bool {
        false
    }

    pub async fn logging_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub fn init_tracing() {}

    pub async fn shutdown_tracer() {}

    pub fn track_authz_decision(_outcome: &str, _reason: &str) {}
    pub fn track_login_success(_kind: &str) {}
    pub fn track_login_failure(_reason: &str) {}
    pub fn track_shadow_sync(_kind: &str) {}
    pub fn track_token_issued(_guard: &str) {}
    pub fn track_token_validation(_success: bool) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
