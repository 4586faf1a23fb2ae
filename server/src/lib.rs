//! HTTP relays between the voice chat front end and the AI services it
//! uses: streamed chat completions, text-to-speech and speech-to-text.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod upstream;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{ServerConfig, UpstreamConfig};
use crate::error::ApiError;
use crate::metrics::RelayMetrics;
use crate::upstream::UpstreamClient;

#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
    pub metrics: RelayMetrics,
    pub config: Arc<ServerConfig>,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, upstream: UpstreamConfig) -> Self {
        Self {
            upstream: UpstreamClient::new(upstream),
            metrics: RelayMetrics::new(),
            config: Arc::new(config),
            started: Instant::now(),
        }
    }
}

const REQUEST_ID_HEADER: &str = "x-request-id";

async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = value.clone() {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    let mut response = next.run(request).await;
    if let Some(value) = value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let Some(allowed) = &config.cors_allowed_origins else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = allowed
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the relay router, mounted both at `/` and under `/api`.
pub fn build_router(state: AppState) -> Result<Router, ApiError> {
    let config = state.config.clone();

    // Global limit: every client shares one bucket, which behaves the same
    // behind proxies where the peer address is not the client.
    let per_minute = config.rate_limit_per_minute.max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond((60_000 / per_minute as u64).max(1))
            .burst_size(per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or(ApiError::Configuration("RATE_LIMIT_PER_MINUTE"))?,
    );
    info!("Rate limiting: {} requests per minute", per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(&config))
        .into_inner();

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/voices", get(handlers::list_voices))
        .route("/chat", post(handlers::chat_relay))
        .route("/tts", post(handlers::tts_relay))
        .route("/stt", post(handlers::stt_relay))
        .route("/metrics", get(handlers::metrics_endpoint));

    Ok(Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state))
}
