// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::collections::HashMap;
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::live_poller::spawn_live_poller;
use crate::application::live_status::LiveStatusTracker;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::application::visualization_controller::VisualizationController;
use crate::domain::package::Package;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_repository::HttpRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_view, health_check, list_packages, refresh, set_mode, set_model_options, toggle_channel,
    update_live_set,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let app_config = load_app_config()?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn TelemetryRepository> = Arc::new(HttpRepository::new(
        app_config.api.base_url.clone(),
        app_config.api.ambient_temperature_path.clone(),
    ));

    // One controller per package, all fed by the same live tracker
    let tracker = LiveStatusTracker::new();
    let mut controllers = HashMap::new();
    for package_config in &app_config.packages {
        let settings = app_config.controller_settings(package_config)?;
        let controller = VisualizationController::new(
            Package::new(package_config.id.clone()),
            settings,
            repository.clone(),
            &tracker,
        );
        controllers.insert(package_config.id.clone(), controller);
    }
    if controllers.is_empty() {
        tracing::warn!("No packages configured");
    }

    let _poller = spawn_live_poller(
        controllers.values().cloned().collect(),
        app_config.live_poll_settings(),
    );

    // Create application state
    let state = Arc::new(AppState {
        tracker,
        controllers,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/packages", get(list_packages))
        .route("/packages/:id/view", get(get_view))
        .route("/packages/:id/refresh", post(refresh))
        .route("/packages/:id/mode", post(set_mode))
        .route("/packages/:id/channels/:name/toggle", post(toggle_channel))
        .route("/packages/:id/model-options", post(set_model_options))
        .route("/live", put(update_live_set))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = app_config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", app_config.server.bind_address))?;
    tracing::info!("Starting sensor-visualization service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
