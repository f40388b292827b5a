//! busroute server - school bus route suggestion backend

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use busroute_server::api;
use busroute_server::cancel::CancelToken;
use busroute_server::config::Config;
use busroute_server::directions::OsrmDirections;
use busroute_server::persistence::init_database;
use busroute_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("busroute_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting busroute server...");

    let config = Config::from_env();
    let port = config.server_port;
    let db = init_database(&config.database_path, config.database_max_connections).await?;
    let directions = OsrmDirections::from_config(&config)?;
    tracing::info!(url = %config.directions_url, "Using directions service");

    let state = Arc::new(AppState::new(db, config).with_directions(Arc::new(directions)));
    let shutdown = state.shutdown.clone();

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl-C, then cancel in-flight runs.
async fn shutdown_signal(shutdown: CancelToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}
