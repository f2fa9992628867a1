use anyhow::Context;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_desk::{
    config::Config,
    controllers,
    store::{RemoteStore, RestStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    if config.app.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting Studio Desk API ({})", config.app.environment);

    let store: Arc<dyn RemoteStore> =
        Arc::new(RestStore::from_config(&config.store).context("Failed to build store client")?);
    info!("Store client ready for {}", config.store.url);

    let app_state = AppState::new(config.clone(), store);

    // --- Фоновый счётчик непрочитанных задач ---
    if let Some(user_id) = config.notifications.dashboard_user_id.clone() {
        match app_state.tasks.watch(&user_id).await {
            Ok(mut watch) => {
                tokio::spawn(async move {
                    while let Some(unread) = watch.changed().await {
                        info!("User {} has {} unread tasks", watch.user_id(), unread);
                    }
                });
            }
            Err(e) => error!("Unread task watch for {} not started: {}", user_id, e),
        }
    }

    // --- Web server ---
    let app = Router::new()
        .route("/", get(|| async { "Studio Desk API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST and PORT must form a socket address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
