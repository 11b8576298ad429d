use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::info;

use crate::models::AppState;
use crate::session::SessionKey;
use crate::types::{AppError, AppResult};

const FILE_FIELD: &str = "file";
const NAME_FIELD: &str = "name";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload/", post(upload_csv))
        .with_state(state)
}

/// POST /upload/ - multipart form with `file` and optional `name`
async fn upload_csv(
    State(state): State<AppState>,
    session_key: SessionKey,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut file = None;
    let mut name = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content));
            }
            Some(NAME_FIELD) => {
                name = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (file_name, content) =
        file.ok_or_else(|| AppError::InvalidRequest("No file provided".to_string()))?;
    info!(file_name = %file_name, bytes = content.len(), "CSV upload received");

    let mut session = state.sessions.get(&session_key).await;
    let dataset = state
        .service
        .upload(&mut session, &file_name, &content, name.as_deref())
        .await?;
    state.sessions.put(session_key, session).await;

    Ok((StatusCode::CREATED, Json(dataset.as_ref())).into_response())
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidRequest(err.body_text())
    }
}
