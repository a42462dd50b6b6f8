pub mod difficulty;
pub mod engine;
pub mod estimate;
pub mod health;
pub mod matchmaking;
pub mod puzzle;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::middleware::request_id;
use crate::response::AppError;
use crate::state::AppState;

/// Maximum request body size: 2 MiB.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/estimate", estimate::router())
        .nest("/difficulty", difficulty::router())
        .nest("/puzzle", puzzle::router())
        .nest("/matchmaking", matchmaking::router())
        .nest("/engine", engine::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> AppError {
    AppError::not_found("Route not found")
}

/// Runs CPU-bound engine work off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "engine task failed");
        AppError::internal("engine task failed")
    })?
}
