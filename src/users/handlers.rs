use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use super::dto::{LoginRequest, PostUserRequest, UserView};
use crate::{auth::AuthSession, error::AppError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/user/me", get(get_me))
        .route("/user/:username", get(get_user))
}

/// POST /api/register
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<PostUserRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = state.profiles.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/login: sets the session cookie.
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, StatusCode), AppError> {
    let user = state.profiles.login(payload).await?;
    let token = state.sessions.issue(&user)?;
    Ok((jar.add(state.sessions.session_cookie(token)), StatusCode::OK))
}

/// GET /api/user/me
#[instrument(skip(state, session), fields(user_id = session.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(state.profiles.get_me(session.user_id).await?))
}

/// GET /api/user/:username
#[instrument(skip(state, _session))]
pub async fn get_user(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(username): Path<String>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(state.profiles.get_user(&username).await?))
}
