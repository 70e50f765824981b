use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether match operations can currently be served, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_match_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "match store health check failed");
            }
        }
        Err(_) => warn!("match store unavailable (degraded mode)"),
    }

    HealthResponse::from_degraded(state.is_degraded())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::match_store::memory::MemoryMatchStore, state::AppState,
    };

    #[tokio::test]
    async fn degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(
            health_status(&state).await,
            HealthResponse::from_degraded(true)
        );

        state.set_match_store(Arc::new(MemoryMatchStore::new())).await;
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
