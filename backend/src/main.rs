use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use willkeeper_backend::{
    create_app, telemetry, AppState, Config, EventSink, LocalAuthority, SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    telemetry::init(&config.logging)?;

    let authority = Arc::new(LocalAuthority::new(Arc::new(SystemClock)));
    let app = create_app(AppState::new(authority, EventSink::default()));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Will keeper listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
