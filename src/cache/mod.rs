//! Process-wide read-through caches for the profile read path.
//!
//! `CacheStore` is built once in `AppState::init` and shared by `Arc`. Nothing
//! here talks to the database: callers read through their own transaction and
//! fill the maps afterwards, so no cache lock is ever held across an `.await`.

pub mod invalidation;
pub mod keyed;

use tracing::debug;

use crate::{icons::hasher::IconHash, users::dto::UserView};

pub use keyed::KeyedCache;

#[derive(Default)]
pub struct CacheStore {
    pub user_views: KeyedCache<i64, UserView>,
    pub icon_hash_by_user_id: KeyedCache<i64, IconHash>,
    pub icon_hash_by_username: KeyedCache<String, IconHash>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry derived from the given user's rows.
    ///
    /// Both icon-hash maps are cleared together; clearing only one would let
    /// the assembler keep serving a pre-replace hash through the other.
    pub fn evict_user(&self, user_id: i64, username: &str) {
        self.user_views.delete(&user_id);
        self.icon_hash_by_user_id.delete(&user_id);
        self.icon_hash_by_username.delete(username);
        debug!(user_id, username, "user cache entries evicted");
    }
}
