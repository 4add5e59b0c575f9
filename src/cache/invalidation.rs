use std::sync::Arc;

use tracing::debug;

use super::KeyedCache;

/// Published by domains whose cached entities embed a user (livestreams,
/// livecomments). Called after a user's identity-bearing rows change.
pub trait OwnerCacheInvalidator: Send + Sync {
    fn label(&self) -> &'static str;
    fn invalidate_by_owner_id(&self, owner_id: i64);
}

pub trait OwnedByUser {
    fn owner_id(&self) -> i64;
}

/// Entity cache keyed by entity id whose values remember their owner.
pub struct OwnerIndexedCache<V> {
    label: &'static str,
    entries: KeyedCache<i64, V>,
}

impl<V: Clone> OwnerIndexedCache<V> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: KeyedCache::new(),
        }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &KeyedCache<i64, V> {
        &self.entries
    }
}

impl<V> OwnerCacheInvalidator for OwnerIndexedCache<V>
where
    V: OwnedByUser + Clone + Send + Sync,
{
    fn label(&self) -> &'static str {
        self.label
    }

    fn invalidate_by_owner_id(&self, owner_id: i64) {
        let removed = self
            .entries
            .delete_where(|_, value| value.owner_id() == owner_id);
        debug!(cache = self.label, owner_id, removed, "owner entries invalidated");
    }
}

/// What a sibling cache remembers about an entity's owner. Entries may be
/// cached before the owner row exists, so they are keyed by id alone.
#[derive(Debug, Clone, Copy)]
pub struct OwnerSnapshot {
    pub owner_id: i64,
}

impl OwnedByUser for OwnerSnapshot {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

/// Fans a user invalidation out to every registered sibling cache.
#[derive(Default, Clone)]
pub struct InvalidationHub {
    siblings: Vec<Arc<dyn OwnerCacheInvalidator>>,
}

impl InvalidationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, sibling: Arc<dyn OwnerCacheInvalidator>) -> Self {
        self.siblings.push(sibling);
        self
    }

    pub fn invalidate_by_owner_id(&self, owner_id: i64) {
        for sibling in &self.siblings {
            sibling.invalidate_by_owner_id(owner_id);
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.siblings.iter().map(|s| s.label()).collect()
    }
}
