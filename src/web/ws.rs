//! WebSocket endpoint for the control channel
//!
//! Each connection at `/api/ws` becomes one independent session; the
//! dispatcher owns it until the channel closes.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;

use crate::config::Config;
use crate::session::dispatcher;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(config): State<Arc<Config>>) -> Response {
    ws.on_upgrade(move |socket| dispatcher::run(socket, config))
}
