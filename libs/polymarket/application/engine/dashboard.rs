//! Push-only status dashboard.
//!
//! Serves a single static page plus a `/ws` upgrade that rebroadcasts every
//! `DashboardEvent` published through `EngineContext::publish`. No inbound
//! control surface: the socket is write-only from the server's side, so the
//! dashboard can never be used to steer the engines it's reporting on.

use super::{DashboardEvent, EngineContext};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

const INDEX_HTML: &str = include_str!("dashboard_index.html");

#[derive(Clone)]
struct DashboardState {
    tx: broadcast::Sender<DashboardEvent>,
}

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_events(socket, state.tx.subscribe()))
}

async fn push_events(mut socket: WebSocket, mut rx: broadcast::Receiver<DashboardEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(e) => e,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "dashboard: client lagged, dropping buffered events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            return;
        }
    }
}

/// Binds the dashboard on `port` and serves until `ctx.shutdown` flips false.
/// A no-op if the context was built without a dashboard channel.
pub async fn spawn(ctx: Arc<EngineContext>, port: u16) {
    let Some(tx) = ctx.dashboard_tx.clone() else {
        warn!("dashboard: enabled but no broadcast channel wired, skipping");
        return;
    };

    let state = DashboardState { tx };
    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_upgrade))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!(error = %e, port, "dashboard: bind failed, disabling");
            return;
        }
    };
    info!(port, "dashboard: serving on /ws");

    let shutdown = ctx.shutdown_flag();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        while shutdown.load(std::sync::atomic::Ordering::Acquire) {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    });

    if let Err(e) = server.await {
        warn!(error = %e, "dashboard: server exited with error");
    }
}
