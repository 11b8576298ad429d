//! Views over the session's current dataset
//!
//! With no current dataset these return empty values rather than errors so
//! the client can render its initial state.

use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, EquipmentRecord, EquipmentType, SummaryStats};
use crate::session::SessionKey;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/summary/", get(get_summary))
        .route("/equipment/", get(get_equipment))
        .route("/equipment-types/", get(get_equipment_types))
        .with_state(state)
}

/// GET /summary/
async fn get_summary(
    State(state): State<AppState>,
    session_key: SessionKey,
) -> Json<SummaryStats> {
    let session = state.sessions.get(&session_key).await;
    Json(state.service.current_summary(&session).await.unwrap_or_default())
}

/// GET /equipment/
async fn get_equipment(
    State(state): State<AppState>,
    session_key: SessionKey,
) -> Json<Vec<EquipmentRecord>> {
    let session = state.sessions.get(&session_key).await;
    Json(state.service.current_records(&session).await)
}

/// GET /equipment-types/
async fn get_equipment_types(
    State(state): State<AppState>,
    session_key: SessionKey,
) -> Json<BTreeMap<EquipmentType, usize>> {
    let session = state.sessions.get(&session_key).await;
    Json(state.service.type_distribution(&session).await.unwrap_or_default())
}
