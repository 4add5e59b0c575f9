use bytes::Bytes;
use tracing::{debug, info, instrument};

use crate::{
    error::AppError,
    icons::hasher::IconHash,
    service::ProfileService,
    users::{
        assembler::IconOwner,
        repo::{ProfileStore, ProfileTx},
    },
};

#[derive(Debug)]
pub enum IconFetch {
    NotModified,
    Image {
        bytes: Bytes,
        hash: IconHash,
        fallback: bool,
    },
}

impl<S: ProfileStore> ProfileService<S> {
    /// Serves a user's icon, answering `NotModified` straight from the
    /// by-username cache when the client's tag still matches.
    ///
    /// On any cache miss or tag mismatch the hash is recomputed from the
    /// committed blob and both icon-hash entries are overwritten. Mutations
    /// rely on this path never trusting a cached hash without recomputing.
    #[instrument(skip(self))]
    pub async fn fetch_icon(
        &self,
        username: &str,
        if_none_match: Option<&str>,
    ) -> Result<IconFetch, AppError> {
        if let (Some(tag), Some(cached)) = (
            if_none_match,
            self.caches.icon_hash_by_username.get(username),
        ) {
            if cached.matches_etag(tag) {
                debug!("icon not modified (cached)");
                return Ok(IconFetch::NotModified);
            }
        }

        let mut tx = self.store.begin().await?;
        let icon = self
            .assembler
            .read_icon(IconOwner::Username(username), &mut tx)
            .await?;
        tx.commit().await?;

        let hash = icon.hash;
        let (bytes, fallback) = match icon.image {
            Some(image) => (image, false),
            None => (self.fallback.bytes(), true),
        };
        debug!(user_id = icon.user_id, fallback, "icon read");

        if if_none_match.is_some_and(|tag| hash.matches_etag(tag)) {
            return Ok(IconFetch::NotModified);
        }
        Ok(IconFetch::Image {
            bytes,
            hash,
            fallback,
        })
    }

    /// Replaces the user's icon and returns the new icon id.
    #[instrument(skip(self, image), fields(size = image.len()))]
    pub async fn replace_icon(&self, user_id: i64, image: Vec<u8>) -> Result<i64, AppError> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("not found user that has the userid in session"))?;

        tx.delete_icons(user.id).await?;
        let icon_id = tx.insert_icon(user.id, &image).await?;
        tx.commit().await?;

        self.invalidate_user(user.id, &user.name);
        info!(user_id = user.id, icon_id, "icon replaced");
        Ok(icon_id)
    }
}
