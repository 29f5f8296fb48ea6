use std::sync::Arc;

use anyhow::Context;
use core_guard::{SecurityConfig, get_bind_addr, get_db_pool, setup_logging};
use data_model_guard::{MemorySessionStore, MemoryUserStore, PgUserStore, SessionStore, UserStore};

use api_guard::{AppState, reaper, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    setup_logging("api_guard=debug,core_guard=debug,tower_http=debug");

    let config = SecurityConfig::from_env().context("Invalid security configuration")?;
    tracing::debug!("Security configuration: {:?}", config);
    if !config.csrf_enabled {
        tracing::warn!("CSRF protection is disabled");
    }

    let users: Arc<dyn UserStore> = match get_db_pool().await.context("Couldn't connect to database")? {
        Some(pool) => Arc::new(PgUserStore::new(pool)),
        None => {
            tracing::warn!("DATABASE_URL is not set, registered users are kept in memory and lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(config.session_duration));
    reaper::spawn_session_reaper(sessions.clone(), config.session_purge_interval);

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    let state = AppState::new(config, users, sessions)?;
    let app = routes::router(state, &static_dir);

    let addr = get_bind_addr().context("Invalid HOST or PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
