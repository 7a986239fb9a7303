use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use qbit_mobile_proxy::config::Config;
use qbit_mobile_proxy::qbit::api::QbitApi;
use qbit_mobile_proxy::qbit::login::LoginResult;
use qbit_mobile_proxy::qbit::{self, Forwarder, SessionStore};
use qbit_mobile_proxy::{logging, routes};
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let config = Config::parse();

    let client = qbit::build_http_client(config.request_timeout())
        .context("Failed to create HTTP client")?;
    let forwarder = Arc::new(Forwarder::new(
        client,
        config.downstream_base_url(),
        config.credentials(),
        Arc::new(SessionStore::new()),
    )?);
    tracing::info!("Proxying /api/v2 to {}", forwarder.base_url());

    let app = routes::build_router(
        AppState::new(forwarder.clone()),
        &config.static_dir,
        config.max_upload_bytes,
    );

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    tokio::spawn(initial_login(forwarder));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Eager login so the first request doesn't pay for it. Failures only get logged;
/// the forwarder logs in again on the next 401.
async fn initial_login(forwarder: Arc<Forwarder>) {
    match forwarder.establish_session().await {
        LoginResult::SessionEstablished(_) => tracing::info!("Authenticated with qBittorrent"),
        LoginResult::BypassAccepted => tracing::info!("qBittorrent auth bypass is active"),
        LoginResult::LoginRejected => {
            tracing::warn!("Initial qBittorrent login skipped");
            return;
        }
    }

    match QbitApi::new(forwarder).app_version().await {
        Ok(version) => tracing::info!("Connected to qBittorrent {}", version),
        Err(e) => tracing::warn!("Could not read qBittorrent version: {:#}", e),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
