mod api;
mod config;
mod password;
mod probe;
mod session;
mod store;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::api::routes::AppState;
use crate::config::Config;
use crate::password::AdminCredentials;
use crate::probe::HttpProber;
use crate::session::{CookieSettings, MemorySessionStore};
use crate::store::{JsonFileStore, ServiceStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("servicedeckd=info,tower_http=info"))
        )
        .init();

    tracing::info!("Starting servicedeckd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/servicedeck/servicedeckd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    if config.uses_default_password() {
        tracing::warn!("Admin password is the built-in default; set auth.password or SERVICEDECK_ADMIN_PASSWORD");
    }

    // Hash the admin password once; only the digest lives on in app state
    let admin = AdminCredentials::new(config.auth.username.clone(), &config.auth.password);

    let store = JsonFileStore::new(&config.store.path);
    let existing = store
        .list()
        .await
        .with_context(|| format!("Failed to read service store {}", store.path().display()))?;
    tracing::info!("Using service store {:?} ({} services)", store.path(), existing.len());

    let prober = HttpProber::new(config.probe.timeout())
        .context("Failed to build HTTP client for health probes")?;

    let app_state = AppState {
        store: Arc::new(store),
        prober: Arc::new(prober),
        sessions: Arc::new(MemorySessionStore::new(config.auth.session_ttl())),
        admin: Arc::new(admin),
        cookies: CookieSettings {
            max_age: config.auth.session_ttl(),
            secure: config.server.secure_cookies,
        },
    };
    let app = api::routes::router(app_state)
        .layer(api::routes::cors_layer(&config.server.frontend_url)?);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.listen))?;

    tracing::info!("API listening on {}", config.server.listen);

    // Run server with graceful shutdown
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();

    if let Err(e) = server_handle.await {
        tracing::error!("Server task failed: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
