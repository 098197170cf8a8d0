pub mod error;
pub mod handlers;

use std::future::Future;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use error::{ApiError, ErrorBody};
pub use handlers::ApiState;

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/youtube/info", post(handlers::handle_media_info))
        .route("/youtube/download", post(handlers::handle_media_download));

    Router::new()
        .nest("/api", api_routes)
        .route("/chat", post(handlers::handle_chat))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(
    state: ApiState,
    bind: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!(bind, port, "API listening");
    serve_on(listener, state, shutdown).await
}

/// Serve on an already bound listener. Returns once `shutdown` resolves and
/// in-flight requests have drained.
pub async fn serve_on(
    listener: TcpListener,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("API stopped");
    Ok(())
}
