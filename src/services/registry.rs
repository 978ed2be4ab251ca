use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;

use crate::models::{OutputEntry, PendingEntry};
use crate::utils::naming::disambiguate;

/// Metadata the registry can age out.
pub trait Tracked {
    /// Timestamp the expiry window is measured from
    fn stamp(&self) -> DateTime<Utc>;

    /// Pinned entries are never reported as expired
    fn is_pinned(&self) -> bool {
        false
    }
}

impl Tracked for PendingEntry {
    fn stamp(&self) -> DateTime<Utc> {
        self.upload_timestamp
    }

    fn is_pinned(&self) -> bool {
        self.leased
    }
}

impl Tracked for OutputEntry {
    fn stamp(&self) -> DateTime<Utc> {
        self.last_access_timestamp
    }
}

pub type PendingRegistry = Registry<PendingEntry>;
pub type OutputRegistry = Registry<OutputEntry>;

/// In-memory map from stored name to metadata.
///
/// Every operation is atomic for its key (dashmap shard locks); nothing spans
/// two keys.
#[derive(Debug)]
pub struct Registry<M> {
    entries: DashMap<String, M>,
}

impl<M> Default for Registry<M> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

fn is_expired<M: Tracked>(meta: &M, now: DateTime<Utc>, ttl: Duration) -> bool {
    let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
    !meta.is_pinned() && now.signed_duration_since(meta.stamp()) > ttl
}

impl<M: Tracked + Clone> Registry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, name: &str, meta: M) {
        self.entries.insert(name.to_string(), meta);
    }

    pub fn get(&self, name: &str) -> Option<M> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    pub fn remove(&self, name: &str) -> Option<M> {
        self.entries.remove(name).map(|(_, meta)| meta)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names whose stamp is more than `ttl` before `now`.
    pub fn list_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| is_expired(e.value(), now, ttl))
            .map(|e| e.key().clone())
            .collect()
    }

    /// Remove `name` only if it is still expired, re-checked under the key's
    /// write lock.
    ///
    /// `release` runs while the lock is held and must free the backing storage;
    /// returning `false` keeps the entry. A concurrent touch therefore lands
    /// either before the re-check (entry survives) or after the removal (entry
    /// is gone), never in between.
    pub fn evict_if_expired(
        &self,
        name: &str,
        now: DateTime<Utc>,
        ttl: Duration,
        release: impl FnOnce(&M) -> bool,
    ) -> Option<M> {
        self.entries
            .remove_if(name, |_, meta| is_expired(meta, now, ttl) && release(meta))
            .map(|(_, meta)| meta)
    }
}

impl Registry<PendingEntry> {
    /// Mark the entry as in production and return a copy of it.
    ///
    /// At most one caller can hold the lease; every other caller sees `None`,
    /// the same answer as for an unknown, reclaimed or already expired name.
    pub fn lease(&self, name: &str, now: DateTime<Utc>, ttl: Duration) -> Option<PendingEntry> {
        let mut entry = self.entries.get_mut(name)?;
        if entry.leased || is_expired(entry.value(), now, ttl) {
            return None;
        }
        entry.leased = true;
        Some(entry.value().clone())
    }

    /// [`Registry::lease`] wrapped in a guard that gives the lease back when
    /// dropped, so an abandoned production cannot pin the entry forever.
    pub fn lease_guarded(
        &self,
        name: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<(PendingEntry, LeaseGuard<'_>)> {
        let entry = self.lease(name, now, ttl)?;
        let guard = LeaseGuard {
            registry: self,
            name: name.to_string(),
            on_drop: OnDrop::Release,
        };
        Some((entry, guard))
    }

    /// Give a leased entry back to the pool, its original upload time intact.
    pub fn release(&self, name: &str) {
        if let Some(mut entry) = self.entries.get_mut(name) {
            entry.leased = false;
        }
    }

    /// Drop the lease and backdate the entry so it can no longer be leased and
    /// the next sweep removes it together with its file.
    pub fn retire(&self, name: &str) {
        if let Some(mut entry) = self.entries.get_mut(name) {
            entry.leased = false;
            entry.upload_timestamp = DateTime::<Utc>::UNIX_EPOCH;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnDrop {
    Release,
    Retire,
    Nothing,
}

/// A held lease on a pending entry. Dropped unsettled it releases the entry,
/// or retires it once the entry's output exists.
#[derive(Debug)]
pub struct LeaseGuard<'a> {
    registry: &'a PendingRegistry,
    name: String,
    on_drop: OnDrop,
}

impl LeaseGuard<'_> {
    /// From here on the input must not be produced again.
    pub fn retire_on_drop(&mut self) {
        self.on_drop = OnDrop::Retire;
    }

    pub fn release_on_drop(&mut self) {
        self.on_drop = OnDrop::Release;
    }

    /// The entry has been removed; nothing left to undo.
    pub fn settle(mut self) {
        self.on_drop = OnDrop::Nothing;
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        match self.on_drop {
            OnDrop::Release => self.registry.release(&self.name),
            OnDrop::Retire => self.registry.retire(&self.name),
            OnDrop::Nothing => {}
        }
    }
}

impl Registry<OutputEntry> {
    /// Set the last-access time to `now`. Returns `false` if the entry is gone.
    pub fn touch(&self, name: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get_mut(name) {
            Some(mut entry) => {
                entry.last_access_timestamp = now;
                true
            }
            None => false,
        }
    }

    /// Register an output under `preferred`, or under the first free
    /// `stem-n.ext` variant of it, and return the name actually taken.
    pub fn register_unique(&self, preferred: &str, now: DateTime<Utc>) -> String {
        let mut n = 0u32;
        loop {
            let candidate = if n == 0 {
                preferred.to_string()
            } else {
                disambiguate(preferred, n)
            };
            if let Entry::Vacant(slot) = self.entries.entry(candidate.clone()) {
                slot.insert(OutputEntry::new(candidate.clone(), now));
                return candidate;
            }
            n += 1;
        }
    }
}
