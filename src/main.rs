//! IoT lighting gateway
//!
//! Bridges an ESP32 lighting controller with authenticated web clients:
//! REST commands are validated and forwarded to the device, and device
//! status is polled and pushed to WebSocket clients in real time.

mod api;
mod auth;
mod commands;
mod config;
mod db;
mod device;
mod error;
mod models;
mod poller;
mod realtime;
mod state;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::MongoDb;
use crate::device::{DeviceApi, DeviceClient};
use crate::poller::StatusPoller;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iot_lighting_gateway=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting IoT lighting gateway...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!("Configuration loaded");

    // User store and command journal
    let mongo = Arc::new(MongoDb::connect(&config).await?);

    // Device address is resolved once, here
    let device: Arc<dyn DeviceApi> = Arc::new(DeviceClient::new(&config.device.address)?);
    tracing::info!("ESP32 API: http://{}", config.device.address);

    let state = AppState::new(&config, device, mongo.clone(), mongo);

    start_background_tasks(&state, &config);

    // Build application router
    let mut app = api::routes(state.clone()).with_state(state);

    if let Some(dir) = &config.server.static_dir {
        tracing::info!("Serving static files from {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {} (WebSocket: ws://{}/ws)", addr, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Start background tasks (status poller)
fn start_background_tasks(state: &AppState, config: &config::Config) {
    let poller = Arc::new(StatusPoller::new(
        state.device.clone(),
        state.broadcaster.clone(),
        &config.device,
    ));
    tokio::spawn(async move {
        poller.start().await;
    });

    tracing::info!("Background tasks started");
}
