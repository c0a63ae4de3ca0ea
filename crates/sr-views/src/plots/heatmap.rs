//! Heat map of request density
//!
//! Points come from the heat aggregate endpoint. When that answers with
//! something that holds no coordinates, the map-pin endpoint is used instead.

use serde_json::{json, Value};
use sr_core::Record;
use sr_data::ClientConfig;
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::{CoordinatePoint, PointResolver, PointSource};
use crate::{RefreshOutcome, SpaceView, SpaceViewId, ViewError, ViewStatus, ViewerContext};

/// Heat map view
pub struct HeatmapView {
    id: SpaceViewId,
    title: String,
    limit: usize,
    column: Option<String>,
    resolver: PointResolver,
    points: Vec<CoordinatePoint>,
    source: Option<PointSource>,
    status: ViewStatus,
}

impl HeatmapView {
    /// Create a new heat map view
    pub fn new(title: impl Into<String>, limit: usize, intensity: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            limit,
            column: None,
            resolver: PointResolver::new(intensity),
            points: Vec::new(),
            source: None,
            status: ViewStatus::Idle,
        }
    }

    pub fn from_config(title: impl Into<String>, config: &ClientConfig) -> Self {
        Self::new(title, config.heatmap_limit, config.heat_intensity)
    }

    /// Column requested from the heat aggregate endpoint, if any
    pub fn set_column(&mut self, column: Option<&str>) -> Result<(), ViewError> {
        if let Some(column) = column {
            if !Record::has_column(column) {
                return Err(ViewError::UnknownColumn(column.to_string()));
            }
        }
        self.column = column.map(str::to_string);
        Ok(())
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn points(&self) -> &[CoordinatePoint] {
        &self.points
    }

    /// Which endpoint the current points came from
    pub fn source(&self) -> Option<PointSource> {
        self.source
    }
}

#[async_trait::async_trait]
impl SpaceView for HeatmapView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "HeatmapView"
    }

    fn status(&self) -> &ViewStatus {
        &self.status
    }

    async fn refresh(&mut self, ctx: &ViewerContext) -> RefreshOutcome {
        let (filters, tag) = ctx.tagged_filters(0);
        let previous = std::mem::replace(&mut self.status, ViewStatus::Loading);

        let limit = self.limit;
        let primary = ctx
            .service
            .fetch_heat_aggregate(limit, self.column.as_deref(), &filters)
            .await;
        let result = self
            .resolver
            .resolve_with_fallback(&primary, || ctx.service.fetch_map_points(limit, &filters))
            .await;

        if !ctx.is_current(tag, 0) {
            warn!("Discarding stale heat map points (generation {})", tag.generation);
            self.status = previous;
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(resolution) => {
                info!(
                    "Heat map loaded {} points from {:?} source",
                    resolution.points.len(),
                    resolution.source
                );
                self.points = resolution.points;
                self.source = Some(resolution.source);
                self.status = ViewStatus::Ready;
            }
            Err(e) => {
                self.points.clear();
                self.source = None;
                self.status = ViewStatus::Failed(e.to_string());
            }
        }
        RefreshOutcome::Updated
    }

    fn snapshot(&self) -> Value {
        json!({
            "column": self.column,
            "source": self.source,
            "points": self.points,
            "status": self.status,
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
