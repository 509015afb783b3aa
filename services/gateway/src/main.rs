use std::time::Duration;

use gateway::config::GatewayConfig;
use gateway::handler::GatewayHandler;
use gateway::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ws_core::Manager;

#[tokio::main]
async fn main() {
    let config = GatewayConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .init();

    let manager = Manager::new(config.manager, GatewayHandler::new());
    let state = AppState::new(manager.clone());
    let router = gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %config.bind_addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_and_drain(manager))
        .await
        .expect("server error");

    info!("gateway shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT), then drains every live connection
/// through `Manager::shutdown` before returning. Axum's own graceful
/// shutdown only stops accepting new connections and waits for existing
/// ones to close on their own, so this future -- not the server future --
/// is what actually closes upgraded WebSockets.
async fn shutdown_and_drain(manager: Manager<gateway::auth::UserData, GatewayHandler>) {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }

    if manager.shutdown(Duration::from_secs(10)).await.is_err() {
        tracing::warn!("manager shutdown deadline elapsed with connections still draining");
    }
}
