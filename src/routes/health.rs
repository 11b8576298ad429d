use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.store();

    let (status, storage) = if store.is_persistent() {
        match store.ping().await {
            Ok(()) => ("ok", "postgres"),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                ("degraded", "postgres")
            }
        }
    } else {
        ("ok", "memory")
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage: storage.to_string(),
        datasets: store.len().await,
    })
}
