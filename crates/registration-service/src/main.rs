//! Registration Service
//!
//! REST API accepting training registrations and issuing ticket numbers

use anyhow::{Context, Result};
use registration_service::{create_router, AppState, Config, RegistrationService};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registration_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Registration Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Storage backend: {:?}", config.storage_backend);
    info!("Ticket floor: {}", config.ticket_floor);
    info!("Store timeout: {:?}", config.store_timeout);

    // Initialize storage
    let service = RegistrationService::from_config(&config)
        .await
        .context("Failed to initialize registration service")?;

    // Create application state
    let state = AppState::new(service, config.max_upload_bytes);

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Registration Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
