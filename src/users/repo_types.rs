use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserModel {
    pub id: i64,                    // assigned on insert, never changes
    pub name: String,               // unique, never changes
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
}

/// Theme record, exactly one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ThemeModel {
    pub id: i64,
    pub user_id: i64,
    pub dark_mode: bool,
}

/// Columns supplied when registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub password_hash: String,
}
