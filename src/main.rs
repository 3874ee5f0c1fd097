//! Passport Scanner - batch passport ingestion and export server.

use passport_scanner::config::Settings;
use passport_scanner::enhance::OpenAiClient;
use passport_scanner::scan::docai::DocAiProvider;
use passport_scanner::server::{router, AppState};
use passport_scanner::session::SessionStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "passport_scanner=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = Settings::from_env()?;
    info!(
        "Settings loaded: concurrency={}, scan_timeout={}s, dedup={}, enhance_on_export={}",
        settings.concurrency,
        settings.scan_timeout_secs,
        settings.dedup_enabled,
        settings.enhance_on_export
    );

    let http_client = reqwest::Client::new();

    // Initialize the Document AI provider
    let provider = DocAiProvider::new(
        http_client.clone(),
        settings.credentials.clone(),
        settings.docai_location.clone(),
        settings.docai_processor_id.clone(),
    );
    info!("Document AI provider initialized");

    // Initialize the OpenAI enhancer if configured
    let enhancer = OpenAiClient::from_env(http_client).map(Arc::new);
    match &enhancer {
        Some(_) => info!("OpenAI enhancement client initialized"),
        None => info!("OPENAI_API_KEY not set, enhancement disabled"),
    }

    // Build application state
    let bind_addr = settings.bind_addr.clone();
    let state = AppState {
        sessions: SessionStore::new(),
        batches: Arc::new(RwLock::new(HashMap::new())),
        provider: Arc::new(provider),
        enhancer,
        settings: Arc::new(settings),
    };

    // Run server
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
