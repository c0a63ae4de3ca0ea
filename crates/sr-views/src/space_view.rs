//! Space view abstraction - base trait for all views

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{RefreshOutcome, ViewStatus, ViewerContext};

/// Unique identifier for a space view
pub type SpaceViewId = Uuid;

/// Base trait for all space views (table, map, chart, heat map)
#[async_trait]
pub trait SpaceView: Send + Sync {
    /// Get the unique ID of this view
    fn id(&self) -> SpaceViewId;

    /// Get the title of this view
    fn title(&self) -> &str;

    /// Get the view type (for serialization)
    fn view_type(&self) -> &str;

    /// Current load state
    fn status(&self) -> &ViewStatus;

    /// Re-query for the applied filters
    async fn refresh(&mut self, ctx: &ViewerContext) -> RefreshOutcome;

    /// Renderable state as JSON
    fn snapshot(&self) -> Value;

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;

    /// Get as any mut for downcasting
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
