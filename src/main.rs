use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod api;
mod organizer;
mod utils;
mod web;

use crate::organizer::Organizer;

const DEFAULT_PORT: u16 = 5920;

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init_tracing();

    info!("Starting triage v{}", env!("CARGO_PKG_VERSION"));

    let organizer = Arc::new(Organizer::new());

    // Offer the previous session's configuration again, if one was saved.
    // Purely a convenience; any failure here is ignored.
    restore_latest_config(organizer.clone()).await;

    let app = Router::new()
        .nest("/api", api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(organizer.clone());

    let port = std::env::var("TRIAGE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Finish whatever the user already asked for before exiting.
    tokio::task::spawn_blocking(move || organizer.drop_config_wait()).await?;
    info!("Stopped gracefully");
    Ok(())
}

async fn restore_latest_config(organizer: Arc<Organizer>) {
    let result = tokio::task::spawn_blocking(move || {
        let config = utils::persist::load_latest()?;
        organizer.load_config(config).map_err(anyhow::Error::from)
    })
    .await;

    match result {
        Ok(Ok(status)) => info!(
            "restored previous configuration ({} files)",
            status.num_files
        ),
        Ok(Err(err)) => warn!("previous configuration not restored: {err}"),
        Err(err) => warn!("config restore task failed: {err}"),
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
