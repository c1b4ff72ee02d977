use dotenvy::dotenv;
use lectern::router::init_router;
use lectern::state::init_app_state;
use lectern_observability::{init_tracing, shutdown_tracer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing();

    #[cfg(feature = "observability")]
    if let Some(handle) = lectern_observability::init_metrics() {
        let metrics_port = std::env::var("METRICS_PORT").unwrap_or_else(|_| "9090".to_string());
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port)).await?;
        info!(port = %metrics_port, "Metrics server listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, lectern_observability::metrics_app(handle)).await {
                tracing::error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let state = init_app_state().await?;
    let app = init_router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!(port = %port, "Server listening");
    println!("🚀 Server running on http://localhost:{}", port);
    println!("📚 Swagger UI available at http://localhost:{}/swagger-ui", port);
    println!("📖 Scalar UI available at http://localhost:{}/scalar", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    shutdown_tracer().await;
    Ok(())
}
