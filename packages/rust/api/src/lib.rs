//! HTTP API for TopicPress.
//!
//! Routes:
//! - `POST /api/generate-blog`: run the pipeline for `{ "topic": ... }`
//! - `GET /api/blogs`: every stored document
//! - `GET /api/blogs/:id`: one stored document
//! - `GET /api/proxy-image?url=`: stream a remote image through the server
//! - `GET /health`

mod error;
mod handlers;
mod proxy;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use topicpress_core::Pipeline;
use topicpress_shared::{AppConfig, Result, ServerConfig, TopicPressError};
use topicpress_storage::Store;

pub use error::ApiError;
pub use proxy::ImageProxy;

/// Shared application state.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<Store>,
    pub proxy: ImageProxy,
}

impl AppState {
    /// Build the state for `config`: opens the store and wires the pipeline.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(Store::open(&config.storage).await?);
        let pipeline = Arc::new(Pipeline::from_config(config, store.clone())?);
        let proxy = ImageProxy::new(Duration::from_secs(config.server.proxy_timeout_secs))?;
        Ok(Self {
            pipeline,
            store,
            proxy,
        })
    }
}

/// Build the router with CORS and request tracing.
pub fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/api/generate-blog", post(handlers::generate_blog))
        .route("/api/blogs", get(handlers::list_blogs))
        .route("/api/blogs/:id", get(handlers::get_blog))
        .route("/api/proxy-image", get(proxy::proxy_image))
        .route("/health", get(handlers::health))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(TimeoutLayer::new(request_timeout(server)))
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upper bound for a whole request; leaves headroom over the pipeline deadline.
fn request_timeout(server: &ServerConfig) -> Duration {
    Duration::from_secs(server.pipeline_deadline_secs.max(server.proxy_timeout_secs) + 10)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

/// Bind `config.server.bind` and serve until the process is stopped.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(config).await?);
    let app = router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| TopicPressError::Network(format!("failed to bind {}: {e}", config.server.bind)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| TopicPressError::Network(e.to_string()))?;
    info!(%addr, "TopicPress API listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| TopicPressError::Network(format!("server error: {e}")))
}
