//! HTTP endpoint the browser extension submits usage batches to.

mod errors;
mod handlers;
mod middleware;
mod state;

use anyhow::Result;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use errors::GatewayError;
pub use handlers::{parse_batch, UsageEntry};
pub use state::GatewayState;

pub fn router(state: GatewayState) -> Router<()> {
    Router::new()
        .route(
            "/usage",
            post(handlers::submit_usage)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route("/summary", get(handlers::summary))
        .layer(axum_middleware::from_fn(middleware::cors_headers))
        .with_state(state)
}

/// Serves until `shutdown` is cancelled. Requests already being handled are allowed to finish.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(
        "Listening for browser usage on http://{}/usage",
        listener.local_addr()?
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    info!("Gateway stopped");
    Ok(())
}
