//! FDS ML Service - HTTP scoring server

use fds_ml_service::{
    artifacts::ArtifactPaths,
    config::Config,
    create_router, state, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fds_ml_service=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tracing::info!("ML Service starting...");
    tracing::info!("Model directory: {}", config.model_dir.display());

    // One-shot: whatever loads here is served until restart
    let serving = state::bootstrap(&ArtifactPaths::new(&config.model_dir));
    let state = AppState::new(config.clone(), serving);

    let app = create_router(state);

    let addr = config.listen_addr();
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
