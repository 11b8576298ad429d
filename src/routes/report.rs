use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::info;

use crate::models::AppState;
use crate::session::SessionKey;
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-pdf/", post(generate_pdf))
        .with_state(state)
}

/// POST /generate-pdf/ - report for the session's current dataset
async fn generate_pdf(
    State(state): State<AppState>,
    session_key: SessionKey,
) -> AppResult<Response> {
    let session = state.sessions.get(&session_key).await;
    let report = state.service.current_report(&session).await?;

    info!(dataset_id = %report.dataset_id, bytes = report.bytes.len(), "Report generated");

    Ok((
        [
            (header::CONTENT_TYPE, report.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.file_name),
            ),
        ],
        report.bytes,
    )
        .into_response())
}
