use std::sync::Arc;

use socialgram_backend::config::Config;
use socialgram_backend::store::{MemoryMessageStore, MessageStore, PgMessageStore};
use socialgram_backend::{build_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("socialgram_backend=info,tower_http=info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, using the development secret");
    }
    if !config.ws_verify_identity {
        tracing::warn!("WebSocket auth frames are trusted as claimed; set WS_VERIFY_IDENTITY=true to require tokens");
    }

    let store: Arc<dyn MessageStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PgMessageStore::connect(url)?;
            store.run_migrations()?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, messages are kept in memory only");
            Arc::new(MemoryMessageStore::new())
        }
    };

    let state = AppState::new(&config, store)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "socialgram backend listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
