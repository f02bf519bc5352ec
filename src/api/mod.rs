//! Control API.
//!
//! # Routes
//! - `GET /groups`: every group-capable proxy
//! - `GET /groups/{name}`: one group
//! - `GET /groups/{name}/delay?url=&timeout=&statusCodeRange=`: on-demand round
//! - `POST /groups/{name}/select`: pick a member for a connection, marks the group used
//!
//! # Design Decisions
//! - Errors are always `{"message": ...}` with the matching status code
//! - On-demand rounds bypass the debounce guard
//! - Bearer auth only when a secret is configured

pub mod auth;
pub mod error;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::adapter::ProxyRegistry;
use crate::lifecycle::ShutdownSignal;
use self::auth::require_secret;
use self::handlers::*;

pub use error::ApiError;

/// State injected into handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ProxyRegistry>,
    pub secret: Arc<str>,
}

impl ApiState {
    pub fn new(registry: Arc<ProxyRegistry>, secret: &str) -> Self {
        Self {
            registry,
            secret: Arc::from(secret),
        }
    }
}

pub fn setup_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/groups", get(get_groups))
        .route("/groups/{name}", get(get_group))
        .route("/groups/{name}/delay", get(get_group_delay))
        .route("/groups/{name}/select", post(select_group))
        .layer(middleware::from_fn_with_state(state.clone(), require_secret))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Control API listening");

    axum::serve(listener, setup_api_router(state))
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await?;

    tracing::info!("Control API stopped");
    Ok(())
}
