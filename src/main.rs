use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use mrf_portal as portal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = portal::config::load_config()?;
    portal::config::init_tracing(cfg.log_level(), cfg.log_json);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;
    let backend_kind = cfg.backend.kind.clone();
    let email_provider = cfg.email.provider.clone();

    let state = portal::build_state(cfg)?;

    // A backend outage at startup is not fatal; list endpoints refresh on demand.
    if let Err(err) = state.store.load().await {
        warn!(error = %err, "initial load from content backend failed");
    }

    let app = portal::app_router(state);

    info!(%addr, backend = %backend_kind, email = %email_provider, "mrf-portal listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
