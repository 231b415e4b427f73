// Main entry point for the inventory ledger service

use inventory_ledger::api::{create_router, AppState};
use inventory_ledger::auth::{AuthService, TokenService};
use inventory_ledger::config::Config;
use inventory_ledger::ledger::LedgerEngine;
use inventory_ledger::store::{LedgerStore, MemoryStore, PgStore, UserStore};

use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing subscriber with config values
    init_tracing(&config);

    // Storage: Postgres when configured, otherwise the in-memory dev store
    let (ledger_store, user_store): (Arc<dyn LedgerStore>, Arc<dyn UserStore>) =
        match config.database_url.as_deref() {
            Some(url) => {
                let store = Arc::new(PgStore::connect(url, config.database_max_connections).await?);
                info!("Connected to Postgres and applied migrations");
                (store.clone(), store)
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store (data is not durable)");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let engine = Arc::new(LedgerEngine::new(ledger_store.clone()));
    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_secs);
    let auth = Arc::new(AuthService::new(user_store, tokens));

    let address = format!("{}:{}", config.bind_address, config.port);
    let state = AppState {
        engine,
        auth,
        store: ledger_store,
        config: Arc::new(config),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, "inventory-ledger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
