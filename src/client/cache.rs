use std::time::Duration;

use dashmap::DashMap;
use moka::sync::Cache;

const MAX_ENTRIES: u64 = 256;
const TIME_TO_LIVE: Duration = Duration::from_secs(300);

type Key = (&'static str, u64, String);

/// Read-through cache keyed by a tag and the query parameters under it.
///
/// Every tag carries a generation. Entries are stored under the generation
/// that was current when their request started, and only the current
/// generation is ever read, so invalidating a tag also voids responses that
/// were still in flight.
pub struct QueryCache<V> {
    entries: Cache<Key, V>,
    generations: DashMap<&'static str, u64>,
}

impl<V: Clone + Send + Sync + 'static> QueryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(TIME_TO_LIVE)
                .support_invalidation_closures()
                .build(),
            generations: DashMap::new(),
        }
    }

    pub fn generation(&self, tag: &'static str) -> u64 {
        self.generations.get(&tag).map(|g| *g).unwrap_or(0)
    }

    pub fn get(&self, tag: &'static str, params: &str) -> Option<V> {
        self.entries.get(&(tag, self.generation(tag), params.to_string()))
    }

    pub fn insert(&self, tag: &'static str, params: impl Into<String>, value: V) {
        let generation = self.generation(tag);
        self.insert_at(tag, generation, params, value);
    }

    /// Stores a value fetched while `generation` was current.
    ///
    /// Returns `false` and drops the value if the tag was invalidated since.
    pub fn insert_at(&self, tag: &'static str, generation: u64, params: impl Into<String>, value: V) -> bool {
        if generation != self.generation(tag) {
            return false;
        }
        self.entries.insert((tag, generation, params.into()), value);
        true
    }

    /// Voids every entry under `tag`, including ones still being fetched.
    pub fn invalidate_tag(&self, tag: &'static str) -> u64 {
        let generation = {
            let mut current = self.generations.entry(tag).or_insert(0);
            *current += 1;
            *current
        };

        if let Err(e) = self.entries.invalidate_entries_if(move |key, _| key.0 == tag) {
            tracing::warn!(error = %e, "tag invalidation unavailable; clearing cache");
            self.entries.invalidate_all();
        }
        generation
    }
}

impl<V: Clone + Send + Sync + 'static> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_drops_only_the_given_tag() {
        let cache = QueryCache::new();
        cache.insert("users", "", vec![1]);
        cache.insert("users", "bob", vec![2]);
        cache.insert("teams", "", vec![3]);

        assert_eq!(cache.get("users", "bob"), Some(vec![2]));
        assert_eq!(cache.invalidate_tag("users"), 1);
        assert_eq!(cache.get("users", ""), None);
        assert_eq!(cache.get("users", "bob"), None);
        assert_eq!(cache.get("teams", ""), Some(vec![3]));
    }

    #[test]
    fn params_distinguish_entries() {
        let cache = QueryCache::new();
        cache.insert("users", "a", 1);
        cache.insert("users", "b", 2);
        cache.insert("users", "a", 3);

        assert_eq!(cache.get("users", "a"), Some(3));
        assert_eq!(cache.get("users", "b"), Some(2));
        assert_eq!(cache.get("users", "c"), None);
    }

    #[test]
    fn values_fetched_before_an_invalidation_are_discarded() {
        let cache = QueryCache::new();
        let started_at = cache.generation("users");

        cache.invalidate_tag("users");

        assert!(!cache.insert_at("users", started_at, "", vec![0]));
        assert_eq!(cache.get("users", ""), None);

        let now = cache.generation("users");
        assert!(cache.insert_at("users", now, "", vec![1]));
        assert_eq!(cache.get("users", ""), Some(vec![1]));
    }
}
