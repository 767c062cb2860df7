// src/cache.rs

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

struct CacheSlot<V> {
    range: Option<(NaiveDate, NaiveDate)>,
    value: V,
}

/// Keyed cache with explicit invalidation only: by key, by overlapping date
/// range, or wholesale. Entries never expire on their own.
pub struct RangeCache<V> {
    slots: Mutex<HashMap<String, CacheSlot<V>>>,
}

impl<V: Clone> RangeCache<V> {
    pub fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let slots = self.slots.lock().unwrap();
        match slots.get(key) {
            Some(slot) => {
                debug!("Cache HIT for key: {}", key);
                Some(slot.value.clone())
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    /// Stores a value, optionally tagged with the inclusive date range it was
    /// derived from. Untagged entries survive range invalidation.
    pub fn insert(&self, key: &str, range: Option<(NaiveDate, NaiveDate)>, value: V) {
        let mut slots = self.slots.lock().unwrap();
        slots.insert(key.to_string(), CacheSlot { range, value });
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let mut slots = self.slots.lock().unwrap();
        let removed = slots.remove(key).is_some();
        if removed {
            info!("Cache INVALIDATED for key: {}", key);
        }
        removed
    }

    /// Removes every entry whose tagged range overlaps `[start, end]`.
    pub fn invalidate_overlapping(&self, start: NaiveDate, end: NaiveDate) -> usize {
        let mut slots = self.slots.lock().unwrap();
        let before = slots.len();
        slots.retain(|_, slot| match slot.range {
            Some((slot_start, slot_end)) => slot_start > end || slot_end < start,
            None => true,
        });
        let removed = before - slots.len();
        if removed > 0 {
            info!("Cache INVALIDATED {} entries overlapping {} - {}", removed, start, end);
        }
        removed
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for RangeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    #[test]
    fn get_returns_what_insert_stored() {
        let cache: RangeCache<u32> = RangeCache::new();
        assert_eq!(cache.get("answer"), None);
        cache.insert("answer", None, 42);
        assert_eq!(cache.get("answer"), Some(42));
    }

    #[test]
    fn invalidate_by_key_removes_only_that_entry() {
        let cache: RangeCache<u32> = RangeCache::new();
        cache.insert("a", None, 1);
        cache.insert("b", None, 2);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"), "second invalidation is a no-op");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn range_invalidation_removes_overlapping_tagged_entries() {
        let cache: RangeCache<u32> = RangeCache::new();
        cache.insert("may", Some((d("2023-05-01"), d("2023-05-31"))), 5);
        cache.insert("june", Some((d("2023-06-01"), d("2023-06-30"))), 6);
        cache.insert("untagged", None, 0);

        let removed = cache.invalidate_overlapping(d("2023-05-20"), d("2023-06-05"));
        assert_eq!(removed, 2);
        assert_eq!(cache.get("may"), None);
        assert_eq!(cache.get("june"), None);
        assert_eq!(cache.get("untagged"), Some(0), "untagged entries survive");
    }

    #[test]
    fn disjoint_ranges_survive_invalidation() {
        let cache: RangeCache<u32> = RangeCache::new();
        cache.insert("may", Some((d("2023-05-01"), d("2023-05-31"))), 5);
        let removed = cache.invalidate_overlapping(d("2023-06-01"), d("2023-06-30"));
        assert_eq!(removed, 0);
        assert_eq!(cache.get("may"), Some(5));
    }

    #[test]
    fn touching_endpoints_count_as_overlap() {
        let cache: RangeCache<u32> = RangeCache::new();
        cache.insert("may", Some((d("2023-05-01"), d("2023-05-31"))), 5);
        assert_eq!(cache.invalidate_overlapping(d("2023-05-31"), d("2023-06-30")), 1);
    }
}
