use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use czarbox::{
    api, auth,
    config::AppConfig,
    deck::CardCatalog,
    handlers::GameService,
    store::{self, DocumentStore, MemoryStore},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "czarbox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting czarbox...");

    let config = AppConfig::from_env();
    let auth_config = Arc::new(auth::AuthConfig::from_env());

    let catalog = match &config.card_packs_path {
        Some(path) => CardCatalog::load(path),
        None => CardCatalog::builtin(),
    };
    let catalog = match catalog {
        Ok(catalog) => {
            tracing::info!("Loaded {} card pack(s)", catalog.packs.len());
            Arc::new(catalog)
        }
        Err(e) => {
            tracing::error!("Failed to load card packs: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    store::spawn_change_logger(store.as_ref());

    let service = GameService::new(store, catalog, config.retry.clone());
    let app = api::router(service, auth_config);

    tracing::info!("Listening on http://{}", config.bind_addr);
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
