mod dto;
pub mod fallback;
pub mod handlers;
pub mod hasher;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::icon_routes()
}
