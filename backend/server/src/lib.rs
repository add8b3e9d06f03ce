//! # MEMEFI Server
//!
//! Upload endpoint plus the aggregated read views for the MEMEFI frontend.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server for uploads and list views
//! - Wallet-signed writes never go through here, the browser sends them straight to the chain
//! - This server only reads from the chain, through the configured RPC endpoint
//! - Uploads are pinned to IPFS through Pinata, the returned hash goes on chain with `submitMeme`
//!
//!
//!
//! # Routes
//! - `POST /upload`: multipart field `file`, JPEG/PNG/GIF/WebP up to 10MB
//! - `GET /memes`, `GET /memes/{id}`, `GET /memes/{id}/stakes/{address}`
//! - `GET /leaderboard?by=stake|engagement&limit=n`
//! - `GET /contest`, `GET /stats`, `GET /health`
//! - `GET /users/{address}/dashboard`, `GET /users/{address}/nfts`
//! - `GET /nfts/{token_id}/metadata`
//!
//! Errors come back as `{"error": "..."}`.
//!
//!
//!
//! # Notes
//!
//! ## No cache
//! Every request re-reads the chain. Contest state changes every block and the
//! dataset is small (at most 100 memes per contest), so a cache would mostly serve stale stakes.
//!
//! ## Partial results
//! List views return `requested`, `loaded` and `failed` so the frontend can say
//! "N of M loaded" when the RPC endpoint drops some reads.
//!
//!
//!
//! # Setup
//!
//! Secrets are read from `/run/secrets/PINATA_JWT`, falling back to the environment.
//! ```sh
//! RPC_URL=https://data-seed-prebsc-1-s1.binance.org:8545/ RUST_LOG=info cargo run
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod payloads;
pub mod pinata;
pub mod routes;
pub mod state;
pub mod utils;

use routes::{
    contest_handler, dashboard_handler, health_handler, leaderboard_handler, meme_handler,
    memes_handler, metadata_handler, nfts_handler, stake_handler, stats_handler, upload_handler,
};
use state::AppState;
use utils::MAX_UPLOAD_SIZE;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");

    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("Server shutting down...");
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/memes", get(memes_handler))
        .route("/memes/{id}", get(meme_handler))
        .route("/memes/{id}/stakes/{address}", get(stake_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/contest", get(contest_handler))
        .route("/users/{address}/dashboard", get(dashboard_handler))
        .route("/users/{address}/nfts", get(nfts_handler))
        .route("/nfts/{token_id}/metadata", get(metadata_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        // Room for the multipart framing around a maximum size file
        .layer(DefaultBodyLimit::max(2 * MAX_UPLOAD_SIZE))
        .layer(cors(state.config.cors_origin.as_deref()))
        .with_state(state)
}

fn cors(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!("Invalid CORS_ORIGIN: {e}, allowing any origin");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chain::{Contracts, constants::PINATA_GATEWAY};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    const BOUNDARY: &str = "memefi-upload-boundary";
    const MIB: usize = 1024 * 1024;

    fn state(pinata_jwt: Option<&str>) -> Arc<AppState> {
        AppState::from_config(Config {
            port: 0,
            rpc_url: "http://127.0.0.1:1".to_string(),
            chain_id: 97,
            contracts: Contracts::default(),
            fetch_concurrency: 1,
            rpc_timeout: Duration::from_millis(100),
            pinata_jwt: pinata_jwt.map(str::to_string),
            pinata_endpoint: "http://127.0.0.1:1/pinning/pinFileToIPFS".to_string(),
            ipfs_gateway: PINATA_GATEWAY.to_string(),
            cors_origin: None,
        })
    }

    fn multipart(field: &str, content_type: &str, bytes: &[u8]) -> Body {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"meme.png\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Body::from(body)
    }

    async fn upload(state: Arc<AppState>, body: Body) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();

        (status, body["error"].as_str().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let (status, error) = upload(state(Some("jwt")), multipart("image", "image/png", b"png")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "No file provided");
    }

    #[tokio::test]
    async fn test_upload_wrong_type() {
        let (status, error) = upload(
            state(Some("jwt")),
            multipart("file", "application/pdf", b"%PDF-1.7"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.starts_with("Invalid file type application/pdf"));
    }

    #[tokio::test]
    async fn test_upload_over_file_limit() {
        let file = vec![0u8; 11 * MIB];
        let (status, error) = upload(state(Some("jwt")), multipart("file", "image/png", &file)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "File too large. Maximum size is 10MB.");
    }

    #[tokio::test]
    async fn test_upload_over_body_limit() {
        let file = vec![0u8; 25 * MIB];
        let (status, error) = upload(state(Some("jwt")), multipart("file", "image/png", &file)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "File too large. Maximum size is 10MB.");
    }

    #[tokio::test]
    async fn test_upload_without_pinning_configured() {
        let (status, error) = upload(state(None), multipart("file", "image/png", b"png")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error, "IPFS service not configured");
    }
}
