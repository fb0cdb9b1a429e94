//! Commands managing the dashboard API server:
//! - start_dashboard_api: bind and start serving
//! - stop_dashboard_api: graceful shutdown
//! - serve_until_ctrl_c: what `redactlens serve` runs

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{server, DashboardSession};
use crate::core_state::CoreState;

/// Start the dashboard API server on `addr`.
pub async fn start_dashboard_api(
    state: &Arc<CoreState>,
    addr: SocketAddr,
) -> Result<DashboardSession, String> {
    let mut guard = state.dashboard_server.lock().await;
    if guard.is_some() {
        return Err("Dashboard server is already running".into());
    }

    let dashboard_server = server::start_dashboard_server_on(Arc::clone(state), addr)
        .await
        .map_err(|e| format!("Failed to start dashboard server: {e}"))?;

    let session = dashboard_server.session.clone();
    *guard = Some(dashboard_server);

    tracing::info!(addr = %session.server_addr, backend = %state.config.backend_url, "Dashboard API started");
    Ok(session)
}

/// Stop the dashboard API server and wait for it to exit.
pub async fn stop_dashboard_api(state: &CoreState) -> Result<(), String> {
    let server = state.dashboard_server.lock().await.take();
    match server {
        Some(mut server) => {
            server.shutdown();
            server.stopped().await;
            tracing::info!("Dashboard API stopped");
            Ok(())
        }
        None => Err("Dashboard server is not running".into()),
    }
}

/// Serve until Ctrl-C, then shut down gracefully.
pub async fn serve_until_ctrl_c(state: &Arc<CoreState>) -> Result<(), String> {
    let session = start_dashboard_api(state, state.config.bind_addr).await?;
    println!("Dashboard API listening on http://{}", session.server_addr);
    println!("Backend: {}", state.config.backend_url);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl-C: {e}"))?;

    stop_dashboard_api(state).await
}
