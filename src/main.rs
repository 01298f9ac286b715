use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use ara_message_queue::config::Settings;
use ara_message_queue::server::{create_app, AppState};
use ara_message_queue::shutdown::Shutdown;
use ara_message_queue::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing (and OpenTelemetry if enabled)
    let _telemetry = init_telemetry(&settings.log, &settings.otel)?;
    tracing::info!(backend = %settings.queue.backend, "Configuration loaded");

    let shutdown = Arc::new(Shutdown::new());

    // Create application state
    let state = AppState::new(settings.clone(), shutdown.signal())?;
    tracing::info!(backend = %state.broker.backend_name(), "Application state initialized");

    // An unreachable Redis is not fatal: requests fail with 500 until it
    // comes back and the pool reconnects on demand.
    if let Some(pool) = &state.redis_pool {
        match pool.connect_with_backoff(settings.redis.connect_attempts).await {
            Ok(()) => tracing::info!(url = %pool.url(), "Redis reachable"),
            Err(e) => tracing::warn!(
                url = %pool.url(),
                error = %e,
                "Redis not reachable at startup, continuing"
            ),
        }
    }

    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown.clone()))
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal_handler(shutdown: Arc<Shutdown>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Release pending long polls so in-flight requests can drain
    shutdown.trigger();
}
