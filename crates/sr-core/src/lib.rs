//! Core functionality for the service-request viewer
//!
//! This crate provides the record model, the query client abstraction and the
//! shared filter state that every presentation surface reads from.

pub mod data;
pub mod events;
pub mod filters;
pub mod paging;
pub mod state;

// Re-export commonly used types
pub use data::{QueryClient, QueryError, Record, CATEGORICAL_COLUMNS, COLUMN_ORDER};
pub use events::EventBus;
pub use filters::{ColumnValueCache, FilterMap, FilterState};
pub use paging::{Pager, PagingError};
pub use state::AppState;
