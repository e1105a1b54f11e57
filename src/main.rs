use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use serenity::config::AppConfig;
use serenity::db;
use serenity::routes;
use serenity::services::login_throttle::InMemoryLoginThrottle;
use serenity::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    let store = db::connect(&config).await?;
    db::init(store.as_ref(), &config).await?;

    let state = Arc::new(AppState {
        db: store,
        config: config.clone(),
        login_throttle: Arc::new(InMemoryLoginThrottle::default()),
    });

    let app = routes::build(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(environment = %config.app_env, "starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
