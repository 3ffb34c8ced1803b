use booking::{AppState, build_router, database, load_config, services};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    tracing::info!("Loaded configuration:\n{}", config);

    let pool = database::connect(&config.database).await?;
    database::migrate(&pool).await?;
    tracing::info!("Database migrations applied");

    {
        let mut conn = pool.acquire().await?;
        if let Some(admin) = services::users::ensure_admin_account(&mut conn, &config.admin).await? {
            tracing::info!(user_id = %admin.id, username = %admin.username, "Seeded administrator account");
        }
    }

    let address = config.server.bind_address();
    let app = build_router(AppState::new(pool, config));

    let listener = TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Booking API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
