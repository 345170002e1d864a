use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use controller::config::AppConfig;
use controller::state::ControllerState;
use controller::{agent_server, session_server};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::from_default_env()),
        )
        .init();

    let state = Arc::new(ControllerState::new());

    let agent_listener = match net::FramedListener::bind(config.agent_address).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.agent_address, "failed to bind agent listener");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %config.agent_address, "agent server listening");

    let agent_task = tokio::spawn(agent_server::run(agent_listener, state.clone()));

    let app = Router::new()
        .route("/ws", get(session_server::ws_handler))
        .with_state(state);

    let http_listener = match tokio::net::TcpListener::bind(config.http_address).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.http_address, "failed to bind http listener");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %config.http_address, "viewer server listening");

    tokio::select! {
        res = axum::serve(http_listener, app) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "http server exited with error");
            }
        }
        _ = agent_task => {
            tracing::error!("agent server task exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }
}
