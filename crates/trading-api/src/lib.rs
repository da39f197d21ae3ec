//! HTTP API for per-user risk settings, risk profiles and the trade log.
//!
//! Callers identify themselves with the `x-user-id` header; every route is
//! scoped to that user.

mod auth;
mod error;
mod routes;
mod state;

pub use auth::{AuthUser, USER_ID_HEADER};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;

use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Bind `addr` and serve the API until `shutdown` resolves.
pub async fn serve<F>(addr: &str, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}
