//! Router construction and the server loop.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::{ConfigError, ServerConfig},
    ui::{
        handler::{get_lobbies, get_lobby_detail, health_check, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
    usecase::{ReapIdleLobbiesUseCase, SessionContext},
};

/// Errors that stop the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/lobbies", get(get_lobbies))
        .route("/api/lobbies/{game_id}/{lobby_code}", get(get_lobby_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves
///
/// Also runs the idle-lobby reaper every `reap_interval`.
pub async fn serve<F>(
    listener: TcpListener,
    context: SessionContext,
    reap_interval: Duration,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let reaper = tokio::spawn(reap_idle_lobbies(context.clone(), reap_interval));
    let app = create_router(Arc::new(AppState::new(context)));

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    reaper.abort();
    result.map_err(ServerError::from)
}

/// Run the server described by `config` until Ctrl+C or SIGTERM
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let context = config.session_context()?;
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);

    serve(listener, context, config.reap_interval(), shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn reap_idle_lobbies(context: SessionContext, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        ReapIdleLobbiesUseCase::new(context.clone()).execute().await;
    }
}
