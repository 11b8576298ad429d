use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::models::{AppState, DatasetSummary};
use crate::session::SessionKey;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/history/", get(list_history))
        .route("/history/{id}/", get(get_dataset))
        .route("/history/{id}/select/", post(select_dataset))
        .with_state(state)
}

/// GET /history/ - most recent first
async fn list_history(State(state): State<AppState>) -> Json<Vec<DatasetSummary>> {
    Json(state.service.history().await)
}

/// GET /history/{id}/
async fn get_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let dataset = state.service.dataset(parse_dataset_id(&id)?).await?;
    Ok(Json(dataset.as_ref()).into_response())
}

/// POST /history/{id}/select/ - make a dataset current for this session
async fn select_dataset(
    State(state): State<AppState>,
    session_key: SessionKey,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_dataset_id(&id)?;

    let mut session = state.sessions.get(&session_key).await;
    let dataset = state.service.select(&mut session, id).await?;
    state.sessions.put(session_key.clone(), session).await;

    info!(dataset_id = %id, session = %session_key.0, "Dataset selected");
    Ok(Json(dataset.as_ref()).into_response())
}

/// Ids that cannot be parsed are reported like unknown ones.
fn parse_dataset_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::dataset_not_found(raw))
}
