use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::AppError,
    users::repo_types::{NewUser, ThemeModel, UserModel},
};

/// Source of request-scoped transactions.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    type Tx: ProfileTx;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

/// One open transaction. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait ProfileTx: Send {
    async fn find_user_by_id(&mut self, user_id: i64) -> Result<Option<UserModel>, AppError>;
    async fn find_user_by_name(&mut self, name: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_theme(&mut self, user_id: i64) -> Result<Option<ThemeModel>, AppError>;
    async fn find_icon_image(&mut self, user_id: i64) -> Result<Option<Vec<u8>>, AppError>;

    /// Fails with `AppError::Conflict` when the name is taken.
    async fn insert_user(&mut self, user: &NewUser) -> Result<i64, AppError>;
    async fn insert_theme(&mut self, user_id: i64, dark_mode: bool) -> Result<i64, AppError>;
    async fn delete_icons(&mut self, user_id: i64) -> Result<(), AppError>;
    async fn insert_icon(&mut self, user_id: i64, image: &[u8]) -> Result<i64, AppError>;

    async fn commit(self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    type Tx = PgProfileTx;

    async fn begin(&self) -> Result<PgProfileTx, AppError> {
        let tx = self.pool.begin().await?;
        Ok(PgProfileTx { tx })
    }
}

pub struct PgProfileTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProfileTx for PgProfileTx {
    async fn find_user_by_id(&mut self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        let user = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, name, display_name, description, password_hash
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_user_by_name(&mut self, name: &str) -> Result<Option<UserModel>, AppError> {
        let user = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, name, display_name, description, password_hash
            FROM users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_theme(&mut self, user_id: i64) -> Result<Option<ThemeModel>, AppError> {
        let theme = sqlx::query_as::<_, ThemeModel>(
            r#"SELECT id, user_id, dark_mode FROM themes WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(theme)
    }

    async fn find_icon_image(&mut self, user_id: i64) -> Result<Option<Vec<u8>>, AppError> {
        let image = sqlx::query_scalar::<_, Vec<u8>>(
            r#"SELECT image FROM icons WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(image)
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (name, display_name, description, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.display_name)
        .bind(&user.description)
        .bind(&user.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("username '{}' is already taken", user.name))
            }
            other => AppError::Store(other),
        })?;
        Ok(id)
    }

    async fn insert_theme(&mut self, user_id: i64, dark_mode: bool) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO themes (user_id, dark_mode) VALUES ($1, $2) RETURNING id"#,
        )
        .bind(user_id)
        .bind(dark_mode)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn delete_icons(&mut self, user_id: i64) -> Result<(), AppError> {
        sqlx::query(r#"DELETE FROM icons WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_icon(&mut self, user_id: i64, image: &[u8]) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO icons (user_id, image) VALUES ($1, $2) RETURNING id"#,
        )
        .bind(user_id)
        .bind(image)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
