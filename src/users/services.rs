use tracing::{info, instrument, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::AppError,
    service::ProfileService,
    users::{
        dto::{LoginRequest, PostUserRequest, UserView},
        repo::{ProfileStore, ProfileTx},
        repo_types::{NewUser, UserModel},
    },
};

/// Name held back for the platform's own subdomain.
const RESERVED_USERNAME: &str = "pipe";

impl<S: ProfileStore> ProfileService<S> {
    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn register(&self, req: PostUserRequest) -> Result<UserView, AppError> {
        if req.name == RESERVED_USERNAME {
            warn!("reserved username");
            return Err(AppError::BadRequest(format!(
                "the username '{RESERVED_USERNAME}' is reserved"
            )));
        }

        let password_hash = hash_password(req.password).await?;

        let mut tx = self.store.begin().await?;
        let new_user = NewUser {
            name: req.name,
            display_name: req.display_name,
            description: req.description,
            password_hash,
        };
        let user_id = tx.insert_user(&new_user).await?;
        tx.insert_theme(user_id, req.theme.dark_mode).await?;

        self.dns.register_subdomain(&new_user.name).await?;

        let user = UserModel {
            id: user_id,
            name: new_user.name,
            display_name: new_user.display_name,
            description: new_user.description,
            password_hash: new_user.password_hash,
        };
        let view = self.assembler.assemble_uncached(&user, &mut tx).await?;

        tx.commit().await?;
        // sibling caches may hold "unknown owner" placeholders for this id
        self.invalidate_user(user.id, &user.name);

        info!(user_id = user.id, "user registered");
        Ok(view)
    }

    /// Returns the user whose credentials matched; issuing the session is the
    /// caller's job.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn login(&self, req: LoginRequest) -> Result<UserModel, AppError> {
        let mut tx = self.store.begin().await?;
        let user = tx.find_user_by_name(&req.username).await?;
        tx.commit().await?;

        let Some(user) = user else {
            warn!("login unknown username");
            return Err(AppError::InvalidCredentials);
        };
        if !verify_password(req.password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_me(&self, user_id: i64) -> Result<UserView, AppError> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("not found user that has the userid in session"))?;
        let view = self.assembler.assemble(&user, &mut tx).await?;
        tx.commit().await?;
        Ok(view)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, username: &str) -> Result<UserView, AppError> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_name(username)
            .await?
            .ok_or(AppError::NotFound("not found user that has the given username"))?;
        let view = self.assembler.assemble(&user, &mut tx).await?;
        tx.commit().await?;
        Ok(view)
    }
}
