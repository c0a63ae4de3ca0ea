//! Filter maps and the shared filter state controller

mod cache;
mod state;

pub use cache::{ColumnValueCache, ColumnValueCacheEntry};
pub use state::FilterState;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data::Record;

type RawFilters = IndexMap<String, Vec<String>>;

/// Mapping from column name to the set of allowed values
///
/// A column is either absent (no constraint) or present with at least one
/// value. Equality ignores the order of columns and of values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawFilters", into = "RawFilters")]
pub struct FilterMap {
    columns: RawFilters,
}

impl FilterMap {
    /// Create an empty filter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `value` in the column's value set
    ///
    /// Returns `true` if the value is selected after the call. Removing the
    /// last value drops the column entirely.
    pub fn toggle(&mut self, column: &str, value: &str) -> bool {
        let Some(values) = self.columns.get_mut(column) else {
            self.columns.insert(column.to_string(), vec![value.to_string()]);
            return true;
        };

        if let Some(pos) = values.iter().position(|v| v == value) {
            values.remove(pos);
            if values.is_empty() {
                self.columns.shift_remove(column);
            }
            false
        } else {
            values.push(value.to_string());
            true
        }
    }

    /// Remove all constraints on a column
    pub fn remove_column(&mut self, column: &str) -> bool {
        self.columns.shift_remove(column).is_some()
    }

    /// Copy of this map with one column removed
    pub fn without(&self, column: &str) -> FilterMap {
        let mut other = self.clone();
        other.remove_column(column);
        other
    }

    /// Whether `value` is selected for `column`
    pub fn contains(&self, column: &str, value: &str) -> bool {
        self.columns
            .get(column)
            .map(|values| values.iter().any(|v| v == value))
            .unwrap_or(false)
    }

    /// Selected values for a column, in selection order
    pub fn values(&self, column: &str) -> Option<&[String]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Iterate constrained columns
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of constrained columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Order-independent form: sorted columns, each with a sorted value set
    fn canonical(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.columns
            .iter()
            .map(|(column, values)| {
                (column.as_str(), values.iter().map(String::as_str).collect())
            })
            .collect()
    }

    /// Canonical serialization used as a cache key
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(&self.canonical()).unwrap_or_default()
    }

    /// Serialized query parameter, or `None` when there are no filters
    pub fn to_query_param(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(&self.columns).ok()
    }

    /// Check a record against every constrained column (AND of IN-lists)
    pub fn matches(&self, record: &Record) -> bool {
        self.columns.iter().all(|(column, values)| match record.field(column) {
            Some(field) => values.iter().any(|v| *v == field),
            None => false,
        })
    }
}

impl PartialEq for FilterMap {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for FilterMap {}

impl From<RawFilters> for FilterMap {
    fn from(raw: RawFilters) -> Self {
        let mut columns = RawFilters::new();
        for (column, values) in raw {
            let mut unique: Vec<String> = Vec::with_capacity(values.len());
            for value in values {
                if !unique.contains(&value) {
                    unique.push(value);
                }
            }
            if !unique.is_empty() {
                columns.insert(column, unique);
            }
        }
        Self { columns }
    }
}

impl From<FilterMap> for RawFilters {
    fn from(filters: FilterMap) -> Self {
        filters.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut filters = FilterMap::new();

        assert!(filters.toggle("borough", "BRONX"));
        assert!(filters.toggle("borough", "QUEENS"));
        assert!(filters.contains("borough", "BRONX"));
        assert_eq!(filters.len(), 1);

        assert!(!filters.toggle("borough", "BRONX"));
        assert_eq!(filters.values("borough"), Some(&["QUEENS".to_string()][..]));

        assert!(!filters.toggle("borough", "QUEENS"));
        assert!(filters.is_empty());
        assert_eq!(filters.values("borough"), None);
    }

    #[test]
    fn test_canonical_key_ignores_order() {
        let mut a = FilterMap::new();
        a.toggle("status", "Open");
        a.toggle("borough", "BRONX");
        a.toggle("borough", "QUEENS");

        let mut b = FilterMap::new();
        b.toggle("borough", "QUEENS");
        b.toggle("borough", "BRONX");
        b.toggle("status", "Open");

        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(a, b);
        assert_eq!(
            a.canonical_key(),
            r#"{"borough":["BRONX","QUEENS"],"status":["Open"]}"#
        );
    }

    #[test]
    fn test_different_values_differ() {
        let mut a = FilterMap::new();
        a.toggle("borough", "BRONX");
        let mut b = FilterMap::new();
        b.toggle("borough", "QUEENS");

        assert_ne!(a, b);
        assert_ne!(a.canonical_key(), FilterMap::new().canonical_key());
    }

    #[test]
    fn test_query_param_omitted_when_empty() {
        let mut filters = FilterMap::new();
        assert_eq!(filters.to_query_param(), None);

        filters.toggle("city", "BROOKLYN");
        assert_eq!(
            filters.to_query_param().as_deref(),
            Some(r#"{"city":["BROOKLYN"]}"#)
        );
    }

    #[test]
    fn test_deserialize_drops_empty_sets() {
        let filters: FilterMap =
            serde_json::from_str(r#"{"city": [], "borough": ["BRONX", "BRONX"]}"#).unwrap();

        assert_eq!(filters.len(), 1);
        assert_eq!(filters.values("borough"), Some(&["BRONX".to_string()][..]));
    }

    #[test]
    fn test_without_leaves_original_untouched() {
        let mut filters = FilterMap::new();
        filters.toggle("city", "BROOKLYN");
        filters.toggle("status", "Closed");

        let other = filters.without("city");
        assert_eq!(other.len(), 1);
        assert_eq!(filters.len(), 2);
    }

    #[test]
    fn test_matches_record() {
        let record = Record {
            borough: "BRONX".to_string(),
            status: "Open".to_string(),
            ..Default::default()
        };

        let mut filters = FilterMap::new();
        assert!(filters.matches(&record));

        filters.toggle("borough", "BRONX");
        filters.toggle("borough", "QUEENS");
        assert!(filters.matches(&record));

        filters.toggle("status", "Closed");
        assert!(!filters.matches(&record));

        let mut unknown = FilterMap::new();
        unknown.toggle("nonexistent", "x");
        assert!(!unknown.matches(&record));
    }
}
