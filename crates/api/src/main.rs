use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use benthos_api::background::queue::JobQueue;
use benthos_api::config::{DetectorMode, ServerConfig};
use benthos_api::router::build_app_router;
use benthos_api::state::AppState;
use benthos_core::store::DetectionStore;
use benthos_detect::mock::MockDetector;
use benthos_detect::owl::{OwlDetector, DEFAULT_BINARY};
use benthos_detect::Detector;
use benthos_events::ProgressChannel;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "benthos_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Upload directory ---
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload directory");
    tracing::info!(dir = %config.upload_dir.display(), "Upload directory ready");

    // --- Detection backend ---
    let detector: Arc<dyn Detector> = match config.detector {
        DetectorMode::Mock => {
            tracing::warn!("Using the mock detection backend; results are canned");
            Arc::new(MockDetector::fixed_default())
        }
        DetectorMode::Owl => {
            let binary = std::env::var("OWL_BINARY").unwrap_or_else(|_| DEFAULT_BINARY.into());
            tracing::info!(binary = %binary, threshold = config.score_threshold, "Using owl-highlighter backend");
            Arc::new(OwlDetector::new(
                binary,
                config.score_threshold,
                config.show_labels,
            ))
        }
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(DetectionStore::new()),
        queue: Arc::new(JobQueue::new()),
        progress: Arc::new(ProgressChannel::new()),
        detector,
    };

    // --- Router ---
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
