use std::collections::HashMap;

use crate::record::Record;

/// Default capacity (number of parsed records).
const DEFAULT_CAPACITY: usize = 5_000;

/// Bounded map from line index to parsed record.
///
/// Eviction is a locality-window trim rather than LRU: on overflow, entries
/// outside `[i - C/2, i + C/2]` around the just-inserted index are dropped
/// until the cache is at half capacity. Scrolling keeps a warm window around
/// the viewport, and an abrupt jump simply re-centers the window.
pub struct ParseCache {
    entries: HashMap<usize, Record>,
    capacity: usize,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(2),
        }
    }

    pub fn default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Records are handed out as values; the cached copy may be evicted at
    /// any later point.
    pub fn get(&self, line: usize) -> Option<Record> {
        self.entries.get(&line).cloned()
    }

    pub fn contains(&self, line: usize) -> bool {
        self.entries.contains_key(&line)
    }

    pub fn insert(&mut self, line: usize, record: Record) {
        self.entries.insert(line, record);
        if self.entries.len() > self.capacity {
            self.trim_around(line);
        }
    }

    /// Drop entries outside the locality window around `center` until the
    /// cache is at half capacity (or no out-of-window entries remain).
    fn trim_around(&mut self, center: usize) {
        let half = self.capacity / 2;
        let low = center.saturating_sub(half);
        let high = center.saturating_add(half);

        let mut evictable: Vec<usize> = self
            .entries
            .keys()
            .copied()
            .filter(|&k| k < low || k > high)
            .collect();
        // Farthest-first keeps the closest out-of-window entries longest.
        evictable.sort_unstable_by_key(|&k| std::cmp::Reverse(k.abs_diff(center)));

        for key in evictable {
            if self.entries.len() <= half {
                break;
            }
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use std::collections::BTreeMap;

    fn record(n: usize) -> Record {
        Record {
            timestamp: "2024-01-01 00:00:00".into(),
            level: Level::Info,
            message: format!("line {n}"),
            source: "test".into(),
            raw: format!("line {n}"),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn get_and_insert() {
        let mut cache = ParseCache::new(10);
        assert!(cache.get(3).is_none());
        cache.insert(3, record(3));
        assert_eq!(cache.get(3).unwrap().message, "line 3");
        assert!(cache.contains(3));
    }

    #[test]
    fn stays_within_capacity_bounds() {
        let mut cache = ParseCache::new(100);
        for i in 0..1_000 {
            cache.insert(i, record(i));
        }
        assert!(cache.len() <= 100);
    }

    #[test]
    fn eviction_keeps_window_around_insert() {
        let mut cache = ParseCache::new(100);
        // Fill with a far-away region, then jump.
        for i in 0..100 {
            cache.insert(i, record(i));
        }
        cache.insert(10_000, record(10_000));

        // The jump target survives; distant entries were trimmed to half.
        assert!(cache.contains(10_000));
        assert!(cache.len() <= 51);
    }

    #[test]
    fn sequential_scroll_keeps_nearby_lines() {
        let mut cache = ParseCache::new(100);
        for i in 0..150 {
            cache.insert(i, record(i));
        }
        // After trimming around 149, recent lines are still warm.
        assert!(cache.contains(149));
        assert!(cache.contains(148));
        // The very first lines are the farthest and go first.
        assert!(!cache.contains(0));
    }

    #[test]
    fn in_window_entries_survive_trim() {
        let mut cache = ParseCache::new(10);
        for i in 0..20 {
            cache.insert(i, record(i));
        }
        // Window around 19 with half=5 is [14, 24].
        for i in 15..20 {
            assert!(cache.contains(i), "line {i} should be in window");
        }
    }

    #[test]
    fn clear_empties() {
        let mut cache = ParseCache::new(10);
        cache.insert(1, record(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
