//! Reservation server binary
//!
//! Hosts the coordinator; transport integration (the booking API gateway)
//! connects to this process.

use reservation_core::{Config, Coordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting RailRes Reservation Server");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );

    // Open coordinator
    let coordinator = Coordinator::open(config)?;
    let stats = coordinator.stats()?;
    tracing::info!(
        resources = stats.total_resources,
        reservations = stats.total_reservations,
        "Coordinator opened successfully"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down reservation server");
    Ok(())
}
