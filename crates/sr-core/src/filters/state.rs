//! Staged/applied filter state shared by every view

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::{ColumnValueCache, FilterMap};
use crate::data::QueryClient;
use crate::events::events::{AppliedFiltersChanged, ColumnValuesLoaded, QueryFailed};
use crate::events::EventBus;

/// Filter selections, swapped atomically
#[derive(Debug, Clone, Default)]
struct FilterSelections {
    applied: FilterMap,
    staged: FilterMap,
    generation: u64,
}

/// Column value cache plus the columns with a fetch in flight
#[derive(Default)]
struct ColumnValueLoads {
    cache: ColumnValueCache,
    in_flight: AHashMap<String, watch::Sender<()>>,
}

enum ColumnLookup {
    Cached(Vec<String>),
    Wait(watch::Receiver<()>),
    Fetch,
}

/// Filter state controller
///
/// Holds the applied filters (which drive every query), the staged filters
/// (edited but not yet confirmed) and the per-column value cache. Views share
/// one instance through an `Arc`.
pub struct FilterState {
    selections: RwLock<FilterSelections>,
    loads: Mutex<ColumnValueLoads>,
    event_bus: Option<Arc<EventBus>>,
}

impl FilterState {
    /// Create an empty filter state
    pub fn new() -> Self {
        Self {
            selections: RwLock::new(FilterSelections::default()),
            loads: Mutex::new(ColumnValueLoads::default()),
            event_bus: None,
        }
    }

    /// Create a filter state that publishes changes on the given bus
    pub fn with_event_bus(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus: Some(event_bus),
            ..Self::new()
        }
    }

    /// Snapshot of the applied filters
    pub fn applied(&self) -> FilterMap {
        self.selections.read().applied.clone()
    }

    /// Snapshot of the staged filters
    pub fn staged(&self) -> FilterMap {
        self.selections.read().staged.clone()
    }

    /// Applied filters together with their generation, read atomically
    pub fn applied_with_generation(&self) -> (FilterMap, u64) {
        let selections = self.selections.read();
        (selections.applied.clone(), selections.generation)
    }

    /// Counter bumped on every change of the applied filters
    pub fn generation(&self) -> u64 {
        self.selections.read().generation
    }

    /// Whether the staged filters differ from the applied ones
    pub fn has_unapplied_changes(&self) -> bool {
        let selections = self.selections.read();
        selections.applied != selections.staged
    }

    /// Toggle a value in the applied filters (immediate-apply views)
    pub fn toggle_applied(&self, column: &str, value: &str) -> bool {
        let mut selections = self.selections.write();
        let selected = selections.applied.toggle(column, value);
        selections.generation += 1;
        let change = Self::change_event(&selections, false);
        drop(selections);

        debug!("Applied filter {}={} -> {}", column, value, selected);
        self.publish(change);
        selected
    }

    /// Toggle a value in the staged filters (confirm-before-apply views)
    pub fn toggle_staged(&self, column: &str, value: &str) -> bool {
        let selected = self.selections.write().staged.toggle(column, value);
        debug!("Staged filter {}={} -> {}", column, value, selected);
        selected
    }

    /// Promote the staged filters to applied
    ///
    /// Drops the whole value cache and returns the new generation. Listeners
    /// receive a change event asking them to reset paging.
    pub fn apply_staged(&self) -> u64 {
        let mut selections = self.selections.write();
        selections.applied = selections.staged.clone();
        selections.generation += 1;
        let generation = selections.generation;
        let change = Self::change_event(&selections, true);
        drop(selections);

        self.loads.lock().cache.clear();
        info!(
            "Applied staged filters ({} columns, generation {})",
            change.active_columns, generation
        );
        self.publish(change);
        generation
    }

    /// Clear the staged filters only
    pub fn clear_staged(&self) {
        self.selections.write().staged = FilterMap::new();
        debug!("Cleared staged filters");
    }

    /// Clear the applied filters and the value cache, keeping staged edits
    pub fn clear_applied(&self) {
        let mut selections = self.selections.write();
        selections.applied = FilterMap::new();
        selections.generation += 1;
        let change = Self::change_event(&selections, true);
        drop(selections);

        self.loads.lock().cache.clear();
        info!("Cleared applied filters");
        self.publish(change);
    }

    /// Clear applied and staged filters and the value cache
    pub fn clear_all(&self) {
        let mut selections = self.selections.write();
        selections.applied = FilterMap::new();
        selections.staged = FilterMap::new();
        selections.generation += 1;
        let change = Self::change_event(&selections, true);
        drop(selections);

        self.loads.lock().cache.clear();
        info!("Cleared all filters");
        self.publish(change);
    }

    /// Remove one column from both maps
    ///
    /// Every cache entry may have been keyed against filters containing the
    /// column, so the whole cache goes.
    pub fn clear_column(&self, column: &str) {
        let mut selections = self.selections.write();
        selections.applied.remove_column(column);
        selections.staged.remove_column(column);
        selections.generation += 1;
        let change = Self::change_event(&selections, true);
        drop(selections);

        self.loads.lock().cache.clear();
        info!("Cleared filter for column '{}'", column);
        self.publish(change);
    }

    /// Whether a value fetch for the column is in flight
    pub fn is_loading(&self, column: &str) -> bool {
        self.loads.lock().in_flight.contains_key(column)
    }

    /// Cached values for a column, if still valid for the applied filters
    pub fn cached_values(&self, column: &str) -> Option<Vec<String>> {
        let key = self.selections.read().applied.without(column).canonical_key();
        self.loads.lock().cache.get(column, &key)
    }

    /// Candidate values for a column, scoped to the other applied filters
    ///
    /// Served from cache when the cache key still matches. Concurrent calls
    /// for the same column wait on the in-flight fetch instead of issuing a
    /// second request. A failed fetch yields an empty list and is not cached.
    pub async fn get_column_values(&self, column: &str, client: &dyn QueryClient) -> Vec<String> {
        loop {
            let other_filters = self.selections.read().applied.without(column);
            let key = other_filters.canonical_key();

            match self.lookup(column, &key) {
                ColumnLookup::Cached(values) => {
                    debug!("Using cached values for {}", column);
                    self.publish(ColumnValuesLoaded {
                        column: column.to_string(),
                        count: values.len(),
                        from_cache: true,
                    });
                    return values;
                }
                ColumnLookup::Wait(mut receiver) => {
                    debug!("Waiting for in-flight values for {}", column);
                    // Resolves once the loader drops its sender
                    let _ = receiver.changed().await;
                }
                ColumnLookup::Fetch => {
                    return self.fetch_column_values(column, other_filters, key, client).await;
                }
            }
        }
    }

    /// Check the cache and claim the column for fetching if nobody else has
    fn lookup(&self, column: &str, key: &str) -> ColumnLookup {
        let mut loads = self.loads.lock();
        if let Some(values) = loads.cache.get(column, key) {
            return ColumnLookup::Cached(values);
        }
        if let Some(sender) = loads.in_flight.get(column) {
            return ColumnLookup::Wait(sender.subscribe());
        }
        let (sender, _) = watch::channel(());
        loads.in_flight.insert(column.to_string(), sender);
        ColumnLookup::Fetch
    }

    async fn fetch_column_values(
        &self,
        column: &str,
        other_filters: FilterMap,
        key: String,
        client: &dyn QueryClient,
    ) -> Vec<String> {
        let _in_flight = InFlight { state: self, column };
        info!("Loading filter values for {}", column);

        match client.fetch_column_values(column, &other_filters).await {
            Ok(values) => {
                self.loads.lock().cache.put(column, key, values.clone());
                self.publish(ColumnValuesLoaded {
                    column: column.to_string(),
                    count: values.len(),
                    from_cache: false,
                });
                values
            }
            Err(e) => {
                error!("Failed to load filter values for {}: {}", column, e);
                self.publish(QueryFailed {
                    operation: format!("columnValues:{}", column),
                    error: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn change_event(selections: &FilterSelections, reset_paging: bool) -> AppliedFiltersChanged {
        AppliedFiltersChanged {
            generation: selections.generation,
            active_columns: selections.applied.len(),
            reset_paging,
        }
    }

    fn publish<E: crate::events::Event>(&self, event: E) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases a column's in-flight claim, waking any waiters
struct InFlight<'a> {
    state: &'a FilterState,
    column: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.loads.lock().in_flight.remove(self.column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{QueryError, Record};
    use crate::events::handler_from_fn;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Counts column-value requests and echoes the filters it was given
    struct CountingClient {
        calls: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
        fail: bool,
    }

    impl CountingClient {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl QueryClient for CountingClient {
        async fn fetch_records(
            &self,
            _limit: usize,
            _start: usize,
            _filters: &FilterMap,
        ) -> Result<Vec<Record>, QueryError> {
            Ok(Vec::new())
        }

        async fn fetch_column_values(
            &self,
            column: &str,
            filters: &FilterMap,
        ) -> Result<Vec<String>, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.map_err(|e| QueryError::Transport(e.to_string()))?;
            }
            if self.fail {
                return Err(QueryError::Transport("connection refused".to_string()));
            }
            Ok(vec![format!("{}|{}", column, filters.canonical_key())])
        }

        async fn fetch_count(&self, _filters: &FilterMap) -> Result<u64, QueryError> {
            Ok(0)
        }

        async fn fetch_map_points(&self, _limit: usize, _filters: &FilterMap) -> Result<Value, QueryError> {
            Ok(Value::Array(Vec::new()))
        }

        async fn fetch_heat_aggregate(
            &self,
            _limit: usize,
            _column: Option<&str>,
            _filters: &FilterMap,
        ) -> Result<Value, QueryError> {
            Ok(Value::Array(Vec::new()))
        }

        fn source_name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_staged_and_applied_are_isolated() {
        let state = FilterState::new();

        state.toggle_staged("borough", "BRONX");
        assert!(state.applied().is_empty());
        assert!(state.has_unapplied_changes());

        state.toggle_applied("status", "Open");
        assert!(!state.staged().contains("status", "Open"));

        state.apply_staged();
        assert_eq!(state.applied(), state.staged());
        assert!(!state.has_unapplied_changes());

        // Later edits to staged must not leak into applied
        state.toggle_staged("borough", "QUEENS");
        assert!(!state.applied().contains("borough", "QUEENS"));
        assert!(state.has_unapplied_changes());
    }

    #[test]
    fn test_generation_tracks_applied_changes() {
        let state = FilterState::new();
        let start = state.generation();

        state.toggle_staged("city", "BROOKLYN");
        assert_eq!(state.generation(), start);

        state.apply_staged();
        state.toggle_applied("city", "QUEENS");
        state.clear_column("city");
        state.clear_applied();
        assert_eq!(state.generation(), start + 4);
    }

    #[test]
    fn test_clear_column_hits_both_maps() {
        let state = FilterState::new();
        state.toggle_staged("city", "BROOKLYN");
        state.toggle_staged("status", "Open");
        state.apply_staged();
        state.toggle_staged("city", "BRONX");

        state.clear_column("city");

        assert_eq!(state.applied().values("city"), None);
        assert_eq!(state.staged().values("city"), None);
        assert!(state.applied().contains("status", "Open"));
    }

    #[test]
    fn test_clear_applied_keeps_staged() {
        let state = FilterState::new();
        state.toggle_applied("city", "BROOKLYN");
        state.toggle_staged("status", "Open");

        state.clear_applied();
        assert!(state.applied().is_empty());
        assert!(state.staged().contains("status", "Open"));

        state.clear_all();
        assert!(state.staged().is_empty());
    }

    #[test]
    fn test_clear_staged_keeps_applied() {
        let state = FilterState::new();
        state.toggle_applied("city", "BROOKLYN");
        state.toggle_staged("status", "Open");

        state.clear_staged();

        assert!(state.staged().is_empty());
        assert!(state.applied().contains("city", "BROOKLYN"));
    }

    #[tokio::test]
    async fn test_column_values_cached_until_other_filters_change() {
        let state = FilterState::new();
        let client = CountingClient::new();

        let first = state.get_column_values("city", &client).await;
        let second = state.get_column_values("city", &client).await;
        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);

        // Filtering on the column itself does not change its cache key
        state.toggle_applied("city", "BROOKLYN");
        state.get_column_values("city", &client).await;
        assert_eq!(client.calls(), 1);
        assert!(state.cached_values("city").is_some());

        // A different column does
        state.toggle_applied("status", "Open");
        assert!(state.cached_values("city").is_none());
        let third = state.get_column_values("city", &client).await;
        assert_eq!(client.calls(), 2);
        assert_eq!(third, vec![r#"city|{"status":["Open"]}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_cache_key_is_order_independent() {
        let state = FilterState::new();
        let client = CountingClient::new();

        state.toggle_applied("status", "Open");
        state.toggle_applied("status", "Closed");
        state.get_column_values("city", &client).await;

        // Same set, different insertion order
        state.toggle_applied("status", "Open");
        state.toggle_applied("status", "Open");
        assert_eq!(state.applied().values("status").map(|v| v.len()), Some(2));

        state.get_column_values("city", &client).await;
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_apply_staged_invalidates_cache() {
        let state = FilterState::new();
        let client = CountingClient::new();

        state.get_column_values("city", &client).await;
        state.apply_staged();
        state.get_column_values("city", &client).await;

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let state = FilterState::new();
        let client = CountingClient {
            fail: true,
            ..CountingClient::new()
        };

        assert!(state.get_column_values("city", &client).await.is_empty());
        assert!(state.get_column_values("city", &client).await.is_empty());
        assert_eq!(client.calls(), 2);
        assert!(!state.is_loading("city"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let state = Arc::new(FilterState::new());
        let gate = Arc::new(Semaphore::new(0));
        let client = Arc::new(CountingClient {
            gate: Some(gate.clone()),
            ..CountingClient::new()
        });

        let first = {
            let (state, client) = (state.clone(), client.clone());
            tokio::spawn(async move { state.get_column_values("city", client.as_ref()).await })
        };
        while !state.is_loading("city") {
            tokio::task::yield_now().await;
        }
        let second = {
            let (state, client) = (state.clone(), client.clone());
            tokio::spawn(async move { state.get_column_values("city", client.as_ref()).await })
        };
        tokio::task::yield_now().await;

        gate.add_permits(1);
        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);
        assert!(!state.is_loading("city"));
    }

    #[test]
    fn test_events_request_paging_reset() {
        let bus = Arc::new(EventBus::new());
        let resets = Arc::new(Mutex::new(Vec::new()));
        let sink = resets.clone();
        bus.subscribe::<AppliedFiltersChanged>(handler_from_fn(move |event| {
            if let Some(change) = event.as_any().downcast_ref::<AppliedFiltersChanged>() {
                sink.lock().push(change.reset_paging);
            }
        }));

        let state = FilterState::with_event_bus(bus);
        state.toggle_applied("city", "BRONX");
        state.apply_staged();
        state.clear_column("city");

        assert_eq!(*resets.lock(), vec![false, true, true]);
    }
}
