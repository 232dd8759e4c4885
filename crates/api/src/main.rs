use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rinkmark_core::assignment::{AssignmentSource, InMemoryAssignments};
use rinkmark_core::ffmpeg::FfprobeProbe;
use rinkmark_db::repositories::PgAssignmentSource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rinkmark_api::config::ServerConfig;
use rinkmark_api::router::build_app_router;
use rinkmark_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rinkmark_api=debug,rinkmark_core=debug,rinkmark_db=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        videos_dir = %config.videos_dir.display(),
        data_dir = %config.data_dir.display(),
        "Loaded server configuration"
    );

    // --- Assignment rules ---
    let assignments: Arc<dyn AssignmentSource> = match &config.database_url {
        Some(database_url) => {
            let pool = rinkmark_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            rinkmark_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            rinkmark_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgAssignmentSource::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, assignment rules are kept in memory");
            Arc::new(InMemoryAssignments::new())
        }
    };

    // --- App state ---
    let state = AppState::build(config.clone(), Arc::new(FfprobeProbe), assignments).await;
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // The drain deadline starts when the shutdown signal arrives.
    let (signal_tx, mut signal_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signal_tx.send(true);
        })
        .into_future();

    let drain_limit = Duration::from_secs(config.shutdown_timeout_secs);
    tokio::select! {
        result = server => result.expect("Server error"),
        _ = async {
            let _ = signal_rx.wait_for(|stopped| *stopped).await;
            tokio::time::sleep(drain_limit).await;
        } => {
            tracing::warn!(?drain_limit, "In-flight requests did not drain in time");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
