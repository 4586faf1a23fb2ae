use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use server::config::{ServerConfig, UpstreamConfig};
use server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    info!("Starting voice chat relay server...");

    let config = ServerConfig::from_env();
    let upstream = UpstreamConfig::from_env();
    if upstream.chat_api_key.is_none() {
        warn!("CHAT_API_KEY not set, /chat will fail until it is configured");
    }
    if upstream.elevenlabs_api_key.is_none() {
        warn!("ELEVENLABS_API_KEY not set, /tts and /stt will fail until it is configured");
    }
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, timeout={}s, chat_model={}",
        config.port, config.rate_limit_per_minute, config.request_timeout_secs, upstream.chat_model
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let app = build_router(AppState::new(config, upstream))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
