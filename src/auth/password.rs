//! Argon2id password hashes in PHC string form. Hashing is CPU-bound, so both
//! entry points run on tokio's blocking pool instead of a request worker.

use anyhow::Context;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AppError;

pub async fn hash_password(plain: String) -> Result<String, AppError> {
    on_blocking_pool(move || {
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(plain.as_bytes(), &salt)?
            .to_string())
    })
    .await
}

/// `Ok(false)` on mismatch. An empty stored hash (an account seeded without a
/// password) never matches. `Err` only when a stored hash is unreadable.
pub async fn verify_password(plain: String, stored: String) -> Result<bool, AppError> {
    if stored.is_empty() {
        return Ok(false);
    }
    on_blocking_pool(move || {
        let parsed = PasswordHash::new(&stored)?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    })
    .await
}

async fn on_blocking_pool<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, password_hash::Error> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(work)
        .await
        .context("password hashing task failed")?;
    outcome.map_err(|e| {
        error!(error = %e, "argon2 error");
        AppError::Internal(anyhow::anyhow!("argon2: {e}"))
    })
}
