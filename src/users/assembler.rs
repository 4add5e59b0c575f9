use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::{
    cache::CacheStore,
    error::AppError,
    icons::{
        fallback::FallbackIcon,
        hasher::{hash_bytes, IconHash},
    },
    users::{
        dto::{Theme, UserView},
        repo::ProfileTx,
        repo_types::UserModel,
    },
};

/// Whose icon hash to resolve.
#[derive(Debug, Clone, Copy)]
pub enum IconOwner<'a> {
    Id(i64),
    Username(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconHashLookup {
    pub hash: IconHash,
    pub used_fallback: bool,
}

/// An icon as read from the store. `image` is `None` when the user has no
/// icon row and `hash` is the fallback's.
#[derive(Debug, Clone)]
pub struct IconRead {
    pub user_id: i64,
    pub image: Option<Bytes>,
    pub hash: IconHash,
}

impl IconRead {
    pub fn lookup(&self) -> IconHashLookup {
        IconHashLookup {
            hash: self.hash,
            used_fallback: self.image.is_none(),
        }
    }
}

/// Whether a lookup may fill the caches with what it read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    ReadThrough,
    /// The transaction may still roll back; nothing it saw may be cached.
    Skip,
}

/// Builds `UserView`s cache-first, reading misses through the caller's
/// transaction.
///
/// A user-view hit returns without re-reading the theme or icon. That is only
/// sound because every mutation of those rows goes through
/// `ProfileService::invalidate_user` after commit.
pub struct UserViewAssembler {
    caches: Arc<CacheStore>,
    fallback: Arc<FallbackIcon>,
}

impl UserViewAssembler {
    pub fn new(caches: Arc<CacheStore>, fallback: Arc<FallbackIcon>) -> Self {
        Self { caches, fallback }
    }

    #[instrument(skip(self, user, tx), fields(user_id = user.id))]
    pub async fn assemble<T: ProfileTx>(
        &self,
        user: &UserModel,
        tx: &mut T,
    ) -> Result<UserView, AppError> {
        if let Some(view) = self.caches.user_views.get(&user.id) {
            debug!("user view cache hit");
            return Ok(view);
        }

        let ticket = self.caches.user_views.ticket(&user.id);
        let view = self.compose(user, tx, Fill::ReadThrough).await?;
        if !self.caches.user_views.put_if_current(ticket, user.id, view.clone()) {
            debug!("user view invalidated during assembly; not cached");
        }
        Ok(view)
    }

    /// Same composition as `assemble`, but neither consults nor fills any cache.
    /// Used while the user's own rows are still uncommitted.
    pub async fn assemble_uncached<T: ProfileTx>(
        &self,
        user: &UserModel,
        tx: &mut T,
    ) -> Result<UserView, AppError> {
        self.compose(user, tx, Fill::Skip).await
    }

    /// Cached icon hash for `owner`, read through `tx` on a miss.
    pub async fn get_or_compute_icon_hash<T: ProfileTx>(
        &self,
        owner: IconOwner<'_>,
        tx: &mut T,
    ) -> Result<IconHashLookup, AppError> {
        let cached = match owner {
            IconOwner::Id(id) => self.caches.icon_hash_by_user_id.get(&id),
            IconOwner::Username(name) => self.caches.icon_hash_by_username.get(name),
        };
        if let Some(hash) = cached {
            return Ok(IconHashLookup {
                hash,
                used_fallback: false,
            });
        }
        Ok(self.read(owner, tx, Fill::ReadThrough).await?.lookup())
    }

    /// Reads the icon from the store, ignoring what is cached, and refreshes
    /// the icon-hash entries it is keyed by. The fallback is never cached.
    pub async fn read_icon<T: ProfileTx>(
        &self,
        owner: IconOwner<'_>,
        tx: &mut T,
    ) -> Result<IconRead, AppError> {
        self.read(owner, tx, Fill::ReadThrough).await
    }

    async fn compose<T: ProfileTx>(
        &self,
        user: &UserModel,
        tx: &mut T,
        fill: Fill,
    ) -> Result<UserView, AppError> {
        let theme = tx
            .find_theme(user.id)
            .await?
            .ok_or(AppError::IntegrityFault { user_id: user.id })?;

        let icon = match fill {
            Fill::ReadThrough => {
                self.get_or_compute_icon_hash(IconOwner::Id(user.id), tx)
                    .await?
            }
            Fill::Skip => self.read(IconOwner::Id(user.id), tx, fill).await?.lookup(),
        };
        debug!(user_id = user.id, fallback = icon.used_fallback, "user view composed");

        Ok(UserView {
            id: user.id,
            name: user.name.clone(),
            display_name: user.display_name.clone(),
            description: user.description.clone(),
            theme: Theme {
                id: theme.id,
                dark_mode: theme.dark_mode,
            },
            icon_hash: icon.hash,
        })
    }

    async fn read<T: ProfileTx>(
        &self,
        owner: IconOwner<'_>,
        tx: &mut T,
        fill: Fill,
    ) -> Result<IconRead, AppError> {
        // usernames are immutable, so resolving the id first cannot race a rename
        let (user_id, username, by_name_ticket) = match owner {
            IconOwner::Id(id) => (id, None, None),
            IconOwner::Username(name) => {
                let ticket = self.caches.icon_hash_by_username.ticket(name);
                let user = tx
                    .find_user_by_name(name)
                    .await?
                    .ok_or(AppError::NotFound("not found user that has the given username"))?;
                (user.id, Some(user.name), Some(ticket))
            }
        };
        let by_id_ticket = self.caches.icon_hash_by_user_id.ticket(&user_id);

        let Some(image) = tx.find_icon_image(user_id).await? else {
            // fallback hashes stand in for "no icon row"; caching one would hide a later upload
            debug!(user_id, "no stored icon; using fallback");
            return Ok(IconRead {
                user_id,
                image: None,
                hash: self.fallback.hash(),
            });
        };

        let hash = hash_bytes(&image);
        if fill == Fill::ReadThrough {
            self.caches
                .icon_hash_by_user_id
                .put_if_current(by_id_ticket, user_id, hash);
            if let (Some(name), Some(ticket)) = (username, by_name_ticket) {
                self.caches
                    .icon_hash_by_username
                    .put_if_current(ticket, name, hash);
            }
        }
        Ok(IconRead {
            user_id,
            image: Some(Bytes::from(image)),
            hash,
        })
    }
}
