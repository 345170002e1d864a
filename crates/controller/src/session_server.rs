//! The viewer-facing half of the controller: upgrades `/ws` to a
//! websocket, reads the `SessionConfig` handshake frame, and runs the
//! session until the viewer disconnects or sends a second frame (treated
//! as a "stop this session" signal).

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use common::protocol::SessionConfig;

use crate::session::Session;
use crate::state::ControllerState;
use crate::viewer_socket::ViewerSocket;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ControllerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: axum::extract::ws::WebSocket, state: Arc<ControllerState>) {
    let socket = Arc::new(ViewerSocket::new(socket));

    let config: SessionConfig = match socket.read_json().await {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            tracing::debug!("viewer disconnected before sending config");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode session config");
            return;
        }
    };

    tracing::info!(
        initial_urls = config.initial_urls.len(),
        random_crawl = config.random_crawl,
        "new viewer session"
    );

    let session = Session::new(&config, socket.clone());
    let _ = state.session.send(Some(session.clone()));

    let stop_watcher = tokio::spawn({
        let session = session.clone();
        let socket = socket.clone();
        async move {
            // Any frame after the config is a "stop this session" signal.
            let _ = socket.read_json::<serde_json::Value>().await;
            session.cancellation.cancel();
        }
    });

    session.run().await;

    stop_watcher.abort();
    let _ = state.session.send(None);
    tracing::info!("viewer session ended");
}
