use std::sync::Arc;

use tracing::info;

use crate::{
    cache::{invalidation::InvalidationHub, CacheStore},
    dns::DnsRegistrar,
    icons::fallback::FallbackIcon,
    users::{assembler::UserViewAssembler, repo::ProfileStore},
};

/// Request-level profile operations. The operations themselves live next to
/// their domain: `users::services` and `icons::services`.
pub struct ProfileService<S> {
    pub(crate) store: S,
    pub(crate) caches: Arc<CacheStore>,
    pub(crate) assembler: UserViewAssembler,
    pub(crate) fallback: Arc<FallbackIcon>,
    pub(crate) siblings: InvalidationHub,
    pub(crate) dns: Arc<dyn DnsRegistrar>,
}

impl<S: ProfileStore> ProfileService<S> {
    pub fn new(
        store: S,
        caches: Arc<CacheStore>,
        fallback: Arc<FallbackIcon>,
        siblings: InvalidationHub,
        dns: Arc<dyn DnsRegistrar>,
    ) -> Self {
        Self {
            assembler: UserViewAssembler::new(caches.clone(), fallback.clone()),
            store,
            caches,
            fallback,
            siblings,
            dns,
        }
    }

    #[cfg(test)]
    pub fn assembler(&self) -> &UserViewAssembler {
        &self.assembler
    }

    #[cfg(test)]
    pub fn caches(&self) -> &CacheStore {
        &self.caches
    }

    /// Invalidation fan-out for a user whose rows changed. Call only after the
    /// mutating transaction committed; a rolled-back write must leave every
    /// cache untouched.
    pub fn invalidate_user(&self, user_id: i64, username: &str) {
        self.caches.evict_user(user_id, username);
        self.siblings.invalidate_by_owner_id(user_id);
        info!(user_id, username, siblings = ?self.siblings.labels(), "user invalidated");
    }
}
