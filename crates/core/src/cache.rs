//! Keyed request cache with time-bounded freshness.
//!
//! An entry is *fresh* for `fresh_for_secs` after it was fetched and is
//! served without asking the source. Until `retain_for_secs` it is *stale*:
//! a read triggers a refetch, and the stale value stands in if every attempt
//! fails. Past retention the entry is dropped. Time is always passed in, so
//! callers and tests control the clock.

use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::animal::{Animal, NewAnimal};
use crate::directory::{AnimalDirectory, AnimalPage, AnimalQuery, PedigreeTreeQuery};
use crate::error::{HerdbookError, Result};
use crate::pedigree::{PedigreeTree, PedigreeTreeBuilder, RawAncestorRecord, TreeRequest};
use crate::types::AnimalId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub fresh_for_secs: u64,
    pub retain_for_secs: u64,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_for_secs: 10 * 60,
            retain_for_secs: 15 * 60,
            retries: 1,
        }
    }
}

impl CacheConfig {
    fn fresh_for(&self) -> Duration {
        Duration::from_secs(self.fresh_for_secs)
    }

    fn retain_for(&self) -> Duration {
        Duration::from_secs(self.retain_for_secs.max(self.fresh_for_secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

pub struct RequestCache<K, V> {
    config: CacheConfig,
    entries: IndexMap<K, Entry<V>>,
}

impl<K, V> fmt::Debug for RequestCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> RequestCache<K, V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn freshness(&self, fetched_at: Instant, now: Instant) -> Option<Freshness> {
        let age = now.saturating_duration_since(fetched_at);
        if age < self.config.fresh_for() {
            Some(Freshness::Fresh)
        } else if age < self.config.retain_for() {
            Some(Freshness::Stale)
        } else {
            None
        }
    }

    /// Cached value for `key` and how fresh it is; `None` once past retention.
    pub fn get(&self, key: &K, now: Instant) -> Option<(&V, Freshness)> {
        let entry = self.entries.get(key)?;
        self.freshness(entry.fetched_at, now).map(|f| (&entry.value, f))
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                value,
                fetched_at: now,
            },
        );
    }

    /// Drop one entry; returns whether it was present.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    /// Drop every entry whose key matches; returns how many were dropped.
    pub fn invalidate_where<P: Fn(&K) -> bool>(&mut self, pred: P) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !pred(k));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries past retention; returns how many were dropped.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let retain_for = self.config.retain_for();
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.fetched_at) < retain_for);
        before - self.entries.len()
    }

    /// Serve `key` from cache while fresh, otherwise call `fetcher`, retrying
    /// up to `retries` more times. A stale value is returned if every attempt
    /// fails; with nothing cached the last error becomes [`HerdbookError::Fetch`].
    /// Errors that are not [retryable](HerdbookError::is_retryable) are
    /// returned as-is after the first attempt.
    pub fn fetch_with<F>(&mut self, key: K, now: Instant, mut fetcher: F) -> Result<V>
    where
        F: FnMut(&K) -> Result<V>,
    {
        self.evict_expired(now);
        if let Some((value, Freshness::Fresh)) = self.get(&key, now) {
            return Ok(value.clone());
        }

        let attempts = self.config.retries + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match fetcher(&key) {
                Ok(value) => {
                    self.insert(key, value.clone(), now);
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    log::warn!("Fetch attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        if let Some((value, _)) = self.get(&key, now) {
            log::warn!("Serving stale cache entry after failed refetch");
            return Ok(value.clone());
        }
        Err(HerdbookError::Fetch {
            attempts,
            message: last_error.map(|e| e.user_message()).unwrap_or_default(),
        })
    }
}

/// A directory and tree source fronted by request caches.
///
/// Creating an animal invalidates every cached list, since any of them may
/// now include it.
#[derive(Debug)]
pub struct CachedDirectory<S> {
    source: S,
    lists: RequestCache<AnimalQuery, AnimalPage>,
    animals: RequestCache<AnimalId, Animal>,
    trees: RequestCache<TreeRequest, Vec<RawAncestorRecord>>,
}

impl<S: AnimalDirectory + PedigreeTreeQuery> CachedDirectory<S> {
    pub fn new(source: S, config: CacheConfig) -> Self {
        Self {
            source,
            lists: RequestCache::new(config.clone()),
            animals: RequestCache::new(config.clone()),
            trees: RequestCache::new(config),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn list(&mut self, query: &AnimalQuery, now: Instant) -> Result<AnimalPage> {
        let source = &self.source;
        self.lists.fetch_with(query.clone(), now, |q| source.list(q))
    }

    pub fn get(&mut self, id: &str, now: Instant) -> Result<Animal> {
        let source = &self.source;
        self.animals.fetch_with(id.to_string(), now, |id| source.get(id))
    }

    pub fn create(&mut self, body: &NewAnimal) -> Result<Animal> {
        let created = self.source.create(body)?;
        self.lists.clear();
        Ok(created)
    }

    /// Records behind the tree for `request`, cached per (animal, level).
    pub fn ancestors(&mut self, request: &TreeRequest, now: Instant) -> Result<Vec<RawAncestorRecord>> {
        let source = &self.source;
        self.trees.fetch_with(request.clone(), now, |r| {
            source.ancestors(&r.animal_id_eq, r.level)
        })
    }

    /// Build the tree for `request` from cached or freshly fetched records.
    pub fn tree(&mut self, builder: &PedigreeTreeBuilder, request: &TreeRequest, now: Instant) -> Result<PedigreeTree> {
        let request = TreeRequest {
            animal_id_eq: request.animal_id_eq.clone(),
            level: builder.max_level(),
        };
        let records = self.ancestors(&request, now)?;
        Ok(builder.build(&request.animal_id_eq, &records))
    }

    /// Forget everything cached about `id`: its record and any tree it appears in.
    pub fn invalidate_animal(&mut self, id: &str) {
        self.animals.invalidate(&id.to_string());
        self.trees.invalidate_where(|r| r.animal_id_eq == id);
        let trees = &mut self.trees;
        let stale: Vec<TreeRequest> = trees
            .entries
            .iter()
            .filter(|(_, e)| e.value.iter().any(|rec| rec.id == id))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            trees.invalidate(&key);
        }
        self.lists.clear();
    }
}
