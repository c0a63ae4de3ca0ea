//! Per-column filter value cache

use ahash::AHashMap;

/// Cached candidate values for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValueCacheEntry {
    /// Canonical key of the applied filters, with the column itself removed
    pub key: String,
    /// Values returned by the query API for that key
    pub values: Vec<String>,
}

/// Column value cache keyed by the "other" active filters
///
/// An entry is only served while its stored key equals the caller's key;
/// a mismatch is a miss, never an error.
#[derive(Debug, Default)]
pub struct ColumnValueCache {
    entries: AHashMap<String, ColumnValueCacheEntry>,
}

impl ColumnValueCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get values for a column if the entry was stored under `key`
    pub fn get(&self, column: &str, key: &str) -> Option<Vec<String>> {
        self.entries
            .get(column)
            .filter(|entry| entry.key == key)
            .map(|entry| entry.values.clone())
    }

    /// Store values for a column, replacing any previous entry
    pub fn put(&mut self, column: &str, key: String, values: Vec<String>) {
        self.entries
            .insert(column.to_string(), ColumnValueCacheEntry { key, values });
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_requires_matching_key() {
        let mut cache = ColumnValueCache::new();
        cache.put("city", "{}".to_string(), vec!["BRONX".to_string()]);

        assert_eq!(cache.get("city", "{}"), Some(vec!["BRONX".to_string()]));
        assert_eq!(cache.get("city", r#"{"status":["Open"]}"#), None);
        assert_eq!(cache.get("borough", "{}"), None);
    }

    #[test]
    fn test_put_replaces_and_clear_empties() {
        let mut cache = ColumnValueCache::new();
        cache.put("city", "{}".to_string(), Vec::new());
        cache.put("status", "{}".to_string(), Vec::new());
        cache.put("city", r#"{"status":["Open"]}"#.to_string(), vec!["QUEENS".to_string()]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("city", "{}"), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
