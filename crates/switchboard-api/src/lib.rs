pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use switchboard_core::wire::paths;

pub use handlers::{ApiState, NodeInfo};

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(paths::CONNECTED, get(handlers::handle_connected))
        .route(paths::REGISTER, post(handlers::handle_register))
        .route(paths::DEREGISTER, post(handlers::handle_deregister))
        .route(paths::MESSAGE, post(handlers::handle_message))
        .route(
            paths::INBOX,
            get(handlers::handle_inbox_list).post(handlers::handle_inbox_deliver),
        )
        .route(paths::STATUS, get(handlers::handle_status))
        .with_state(state)
        .layer(cors)
}

/// Bind the API listener. Failure here is fatal for the owning peer.
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    Ok(listener)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(state: ApiState, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, node = %state.node.id, "API listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
