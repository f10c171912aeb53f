use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stockfish_broker_core::{EngineConfig, EnginePool};

mod routes;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

pub struct AppState {
    pub pool: EnginePool,
    pub config: EngineConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tools", get(routes::list_tools))
        .route("/call", post(routes::call))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let pool = match EnginePool::with_config(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to start engine pool: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState { pool, config });
    let app = router(state.clone());

    let addr = std::env::var("BROKER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server running at http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    state.pool.shutdown().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
