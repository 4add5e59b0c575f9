use std::{borrow::Borrow, hash::Hash};

use dashmap::{mapref::entry::Entry, DashMap};

/// A key's generation, read before a lazy fill goes to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

/// Value plus the number of times its key has been invalidated. A deleted key
/// keeps its slot (with no value) so the generation never goes backwards.
#[derive(Debug, Clone)]
struct Slot<V> {
    generation: u64,
    value: Option<V>,
}

/// Invalidation-driven key/value map. Entries live until deleted; there is no
/// TTL and no eviction.
///
/// Entries are sharded, so a writer only excludes readers of keys in the same
/// shard and only for the duration of one operation. Values are cloned out on
/// read; no shard guard escapes a method.
///
/// Every delete advances the key's generation in the same shard operation that
/// drops the value. `put_if_current` compares generations under that shard's
/// lock, so a fill computed from data read before an invalidation can never
/// land after it. Fills for other keys are unaffected.
pub struct KeyedCache<K, V> {
    entries: DashMap<K, Slot<V>>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).and_then(|slot| slot.value.clone())
    }

    /// Unconditional overwrite.
    #[cfg(test)]
    pub fn put(&self, key: K, value: V) {
        self.entries
            .entry(key)
            .or_insert(Slot {
                generation: 0,
                value: None,
            })
            .value = Some(value);
    }

    pub fn ticket<Q>(&self, key: &Q) -> FillTicket
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        FillTicket(self.entries.get(key).map_or(0, |slot| slot.generation))
    }

    /// Stores `value` unless `key` was invalidated since `ticket` was taken.
    /// Returns whether the value was stored.
    pub fn put_if_current(&self, ticket: FillTicket, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.generation != ticket.0 {
                    return false;
                }
                slot.value = Some(value);
                true
            }
            Entry::Vacant(vacant) => {
                if ticket.0 != 0 {
                    return false;
                }
                vacant.insert(Slot {
                    generation: 0,
                    value: Some(value),
                });
                true
            }
        }
    }

    /// Drops the value for `key` and voids every ticket taken for it.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.entries
            .entry(key.to_owned())
            .and_modify(|slot| {
                slot.generation += 1;
                slot.value = None;
            })
            .or_insert(Slot {
                generation: 1,
                value: None,
            });
    }

    /// Removes every value matching `predicate` and returns how many went.
    pub fn delete_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut removed = 0;
        for mut entry in self.entries.iter_mut() {
            let (key, slot) = entry.pair_mut();
            if slot.value.as_ref().is_some_and(|value| predicate(key, value)) {
                slot.generation += 1;
                slot.value = None;
                removed += 1;
            }
        }
        removed
    }

    /// Number of live values.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|slot| slot.value.is_some()).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
