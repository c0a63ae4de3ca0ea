use std::sync::Arc;
use crate::events::EventBus;
use crate::filters::FilterState;

/// The main application state
///
/// One instance is built at startup and handed to every view, so all views
/// observe the same filter transitions.
pub struct AppState {
    /// The event bus
    pub event_bus: Arc<EventBus>,

    /// Applied/staged filters and the column value cache
    pub filters: Arc<FilterState>,
}

impl AppState {
    /// Create a new application state
    pub fn new() -> Self {
        let event_bus = Arc::new(EventBus::new());
        let filters = Arc::new(FilterState::with_event_bus(event_bus.clone()));

        Self { event_bus, filters }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
