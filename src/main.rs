//! OracleNet identity server
//!
//! The cryptographic identity core of the OracleNet social network: SIWE
//! login, GitHub gist proof-of-ownership, Merkle-batch bot assignment, and
//! Merkle-proof bot claims, all resolved into oracle accounts.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oraclenet_identity::config::Config;
use oraclenet_identity::handlers;
use oraclenet_identity::services::accounts::{AccountStore, MemoryAccountStore, RecordStoreClient};
use oraclenet_identity::services::github::{GitHubClient, ProofFetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oraclenet_identity=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting OracleNet identity server");
    tracing::info!("GitHub API: {}", config.github_api_url);

    let github: Arc<dyn ProofFetcher> = Arc::new(GitHubClient::new(
        &config.github_api_url,
        config.github_token.clone(),
    ));

    let accounts: Arc<dyn AccountStore> = match &config.record_store_url {
        Some(url) => {
            tracing::info!("Record store: {}", url);
            Arc::new(RecordStoreClient::new(url, config.record_store_token.clone()))
        }
        None => {
            tracing::warn!("RECORD_STORE_URL not set, using in-memory account store");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let state = handlers::AppState::new(config.clone(), github, accounts);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // SIWE authentication
        .route("/api/auth/siwe/nonce", post(handlers::request_nonce))
        .route("/api/auth/siwe/verify", post(handlers::siwe_verify))
        .route("/api/auth/siwe/check", get(handlers::siwe_check))
        .route("/api/auth/siwe/link", post(handlers::link_wallet))
        // GitHub ownership proof
        .route("/api/identity/verify-github", post(handlers::verify_github))
        .route("/api/identity/check-verified", get(handlers::check_verified))
        // Bot delegation
        .route("/api/identity/assign-bots", post(handlers::assign_bots))
        .route("/api/identity/claim-bot", post(handlers::claim_bot))
        .route("/api/identity/claim-legacy", post(handlers::claim_legacy))
        // State
        .with_state(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
