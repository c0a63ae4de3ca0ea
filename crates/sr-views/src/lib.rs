//! View system for the service-request viewer
//!
//! Every surface (table, map, chart, heat map) is a view-model implementing
//! [`SpaceView`]. Views never own filters: they receive a [`ViewerContext`]
//! holding the one shared [`FilterState`] and the report service.

mod space_view;
pub mod aggregate;
pub mod geo;
pub mod plots;
mod tables;

pub use space_view::{SpaceView, SpaceViewId};
pub use tables::TableView;
pub use plots::{ChartView, HeatmapView, MapPin, MapView};

use std::sync::Arc;

use serde::Serialize;
use sr_core::{FilterMap, FilterState, PagingError};
use sr_data::{ClientConfig, ReportService};
use thiserror::Error;

/// Errors raised by view configuration and navigation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("Display limit must be at least 1")]
    ZeroDisplayLimit,

    #[error("Sample limit must be at least 1")]
    ZeroSampleLimit,

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Paging error: {0}")]
    Paging(#[from] PagingError),
}

/// Context passed to views on every refresh
#[derive(Clone)]
pub struct ViewerContext {
    /// Filters shared by every view
    pub filters: Arc<FilterState>,

    /// Query service with the failure policy applied
    pub service: Arc<ReportService>,

    /// Limits and defaults
    pub config: Arc<ClientConfig>,
}

impl ViewerContext {
    pub fn new(filters: Arc<FilterState>, service: Arc<ReportService>, config: Arc<ClientConfig>) -> Self {
        Self {
            filters,
            service,
            config,
        }
    }

    /// Applied filters together with the tag of a request issued for them
    pub fn tagged_filters(&self, page: usize) -> (FilterMap, RequestTag) {
        let (filters, generation) = self.filters.applied_with_generation();
        (filters, RequestTag { generation, page })
    }

    /// Whether a response tagged `tag` still matches the current state
    pub fn is_current(&self, tag: RequestTag, page: usize) -> bool {
        tag.generation == self.filters.generation() && tag.page == page
    }
}

/// Inputs a request was issued for
///
/// A response is only applied if the applied-filter generation and the page
/// it was fetched for are still current; otherwise it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTag {
    pub generation: u64,
    pub page: usize,
}

/// Load state of a view
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum ViewStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Error replacing the view content
    Failed(String),
}

/// Result of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The view now reflects the current filters
    Updated,
    /// Filters changed while the request was in flight; response dropped
    Stale,
}
