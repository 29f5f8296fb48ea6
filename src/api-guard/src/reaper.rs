use std::sync::Arc;
use std::time::Duration;

use data_model_guard::SessionStore;
use tokio::task::JoinHandle;

/// Periodically drops expired sessions so the store does not grow without bound.
/// Expired sessions are already treated as absent on lookup; this only reclaims memory.
pub fn spawn_session_reaper(sessions: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Session reaper started, purging every {:?}", every);
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            purge_once(sessions.as_ref()).await;
        }
    })
}

pub async fn purge_once(sessions: &dyn SessionStore) -> usize {
    match sessions.purge_expired().await {
        Ok(0) => 0,
        Ok(removed) => {
            tracing::debug!("Purged {} expired sessions", removed);
            removed
        }
        Err(e) => {
            tracing::error!("Error purging expired sessions: {}", e);
            0
        }
    }
}
