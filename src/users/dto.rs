use serde::{Deserialize, Serialize};

use crate::icons::hasher::IconHash;

/// Composed profile returned to clients and cached per user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub theme: Theme,
    pub icon_hash: IconHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub id: i64,
    pub dark_mode: bool,
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct PostUserRequest {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub password: String,
    #[serde(default)]
    pub theme: PostUserRequestTheme,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostUserRequestTheme {
    #[serde(default)]
    pub dark_mode: bool,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
