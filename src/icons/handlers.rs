use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{
        header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use super::{
    dto::{PostIconRequest, PostIconResponse},
    services::IconFetch,
};
use crate::{auth::AuthSession, error::AppError, state::AppState};

pub fn icon_routes() -> Router<AppState> {
    Router::new()
        .route("/user/:username/icon", get(get_icon))
        .route("/icon", post(post_icon))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

/// GET /api/user/:username/icon
#[instrument(skip(state, headers))]
pub async fn get_icon(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let if_none_match = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());

    match state.profiles.fetch_icon(&username, if_none_match).await? {
        IconFetch::NotModified => Ok(StatusCode::NOT_MODIFIED.into_response()),
        IconFetch::Image {
            bytes,
            hash,
            fallback,
        } => {
            debug!(fallback, size = bytes.len(), "serving icon");
            Ok((
                [
                    (CONTENT_TYPE, "image/jpeg".to_string()),
                    (ETAG, hash.etag()),
                ],
                bytes,
            )
                .into_response())
        }
    }
}

/// POST /api/icon { "image": "<base64>" }
#[instrument(skip(state, session, payload), fields(user_id = session.user_id))]
pub async fn post_icon(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<PostIconRequest>,
) -> Result<(StatusCode, Json<PostIconResponse>), AppError> {
    let id = state
        .profiles
        .replace_icon(session.user_id, payload.image)
        .await?;
    Ok((StatusCode::CREATED, Json(PostIconResponse { id })))
}
