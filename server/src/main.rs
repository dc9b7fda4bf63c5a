//! Sicbo Feed - live round feed with next-round prediction

use anyhow::Context;
use sicbo_engine::predictor::ThreadRandom;
use sicbo_engine::SnapshotPublisher;
use sicbo_networking::{spawn_feed, FeedContext};
use sicbo_persistence::RollingHistory;
use sicbo_server::{build_router, AppState, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sicbo_server=info,sicbo_networking=info,sicbo_engine=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // wss:// needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("TLS crypto provider was already installed");
    }

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        "Starting Sicbo Feed (predictor: {}, history: {} rounds)",
        config.predictor,
        config.history_capacity
    );

    let history = Arc::new(RollingHistory::new(config.history_capacity));
    let predictor = config.predictor.build(Arc::new(ThreadRandom));
    let publisher = Arc::new(SnapshotPublisher::new(history.clone(), predictor));

    let context = FeedContext::new(history.clone()).with_observer(publisher.clone());
    let feed = spawn_feed(config.feed, context);

    let state = AppState::new(history, publisher).with_feed(feed.clone());
    let app = build_router(state);

    let addr = SocketAddr::new(config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Snapshot endpoint listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await
        .context("HTTP server error")?;

    feed.shutdown();
    Ok(())
}
