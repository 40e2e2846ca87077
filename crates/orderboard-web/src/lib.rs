//! Orderboard Web Server
//!
//! Axum-based server for the live order board: STOMP over WebSocket for
//! displays and HTTP endpoints for the order service.

pub mod routes;
pub mod state;
pub mod websocket;

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use orderboard_core::{BoardConfig, OrderBoardRegistry};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/board", get(routes::board::get_board))
        .route("/board/refresh", post(routes::board::refresh))
        .route("/board/codes", post(routes::board::create_code))
        .route("/board/codes/{code}", delete(routes::board::release_code))
        .route("/board/codes/{code}/ready", post(routes::board::mark_ready))
        .route("/board/codes/{code}/live", post(routes::board::mark_live))
        .route("/board/codes/{code}/status", put(routes::board::update_status));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api_routes)
        .route(&state.config.ws_path, get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Run the web server until Ctrl-C.
pub async fn run_server(config: BoardConfig, registry: Arc<OrderBoardRegistry>) -> anyhow::Result<()> {
    config.validate()?;
    let addr = config.bind_addr();
    let state = AppState::new(config, registry);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Order board listening on http://{}", addr);

    serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        tracing::info!("Shutting down order board");
    })
    .await
}
