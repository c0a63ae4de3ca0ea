//! Categorical chart view (dashboard pie/bar)
//!
//! Filters here apply immediately: toggling a dropdown value changes the
//! applied filters and the next refresh re-samples.

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde_json::{json, Value};
use sr_core::{FilterMap, Record, CATEGORICAL_COLUMNS};
use sr_data::ClientConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate_column, ChartSlice};
use crate::{RefreshOutcome, SpaceView, SpaceViewId, ViewError, ViewStatus, ViewerContext};

/// Distinct values of every categorical column, in first-seen order
fn distinct_by_column(records: &[Record]) -> BTreeMap<String, Vec<String>> {
    CATEGORICAL_COLUMNS
        .iter()
        .map(|&column| {
            let mut seen = AHashSet::new();
            let values: Vec<String> = records
                .iter()
                .filter_map(|record| record.field(column))
                .filter(|value| seen.insert(value.clone()))
                .collect();
            (column.to_string(), values)
        })
        .collect()
}

/// Chart of one categorical attribute over a record sample
pub struct ChartView {
    id: SpaceViewId,
    title: String,
    attribute: String,
    sample_limit: usize,
    display_limit: usize,

    /// Dropdown options, from an unfiltered sample loaded once
    options: BTreeMap<String, Vec<String>>,
    sample: Vec<Record>,
    slices: Vec<ChartSlice>,
    status: ViewStatus,
}

impl ChartView {
    /// Create a new chart view
    pub fn new(
        title: impl Into<String>,
        attribute: &str,
        sample_limit: usize,
        display_limit: usize,
    ) -> Result<Self, ViewError> {
        if display_limit == 0 {
            return Err(ViewError::ZeroDisplayLimit);
        }
        if sample_limit == 0 {
            return Err(ViewError::ZeroSampleLimit);
        }
        Self::check_attribute(attribute)?;

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.into(),
            attribute: attribute.to_string(),
            sample_limit,
            display_limit,
            options: BTreeMap::new(),
            sample: Vec::new(),
            slices: Vec::new(),
            status: ViewStatus::Idle,
        })
    }

    pub fn from_config(title: impl Into<String>, attribute: &str, config: &ClientConfig) -> Result<Self, ViewError> {
        Self::new(title, attribute, config.chart_sample_limit, config.chart_display_limit)
    }

    fn check_attribute(attribute: &str) -> Result<(), ViewError> {
        if CATEGORICAL_COLUMNS.contains(&attribute) {
            Ok(())
        } else {
            Err(ViewError::UnknownColumn(attribute.to_string()))
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Chart a different attribute over the current sample
    pub fn set_attribute(&mut self, attribute: &str) -> Result<(), ViewError> {
        Self::check_attribute(attribute)?;
        self.attribute = attribute.to_string();
        self.slices = aggregate_column(&self.sample, &self.attribute, self.display_limit);
        Ok(())
    }

    pub fn slices(&self) -> &[ChartSlice] {
        &self.slices
    }

    pub fn sample_len(&self) -> usize {
        self.sample.len()
    }

    /// Dropdown options for a categorical column
    pub fn distinct_values(&self, column: &str) -> Option<&[String]> {
        self.options.get(column).map(Vec::as_slice)
    }

    /// Toggle an applied filter value; returns whether it is now selected
    pub fn toggle_filter(&self, ctx: &ViewerContext, column: &str, value: &str) -> bool {
        ctx.filters.toggle_applied(column, value)
    }

    /// Clear the applied filters
    pub fn clear_filters(&self, ctx: &ViewerContext) {
        ctx.filters.clear_applied();
    }

    async fn load_options(&mut self, ctx: &ViewerContext, filtered: Option<&[Record]>) {
        let unfiltered;
        let records = match filtered {
            Some(records) => records,
            None => {
                unfiltered = ctx.service.fetch_records(self.sample_limit, 0, &FilterMap::new()).await;
                &unfiltered
            }
        };

        // An empty sample is most likely a failed fetch; retry next refresh
        if records.is_empty() {
            return;
        }
        self.options = distinct_by_column(records);
        debug!("Loaded dropdown options from {} records", records.len());
    }
}

#[async_trait::async_trait]
impl SpaceView for ChartView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "ChartView"
    }

    fn status(&self) -> &ViewStatus {
        &self.status
    }

    async fn refresh(&mut self, ctx: &ViewerContext) -> RefreshOutcome {
        let (filters, tag) = ctx.tagged_filters(0);
        let previous = std::mem::replace(&mut self.status, ViewStatus::Loading);

        let sample = ctx.service.fetch_records(self.sample_limit, 0, &filters).await;

        if self.options.is_empty() {
            // Without filters the sample already is the unfiltered one
            let reuse = filters.is_empty().then_some(sample.as_slice());
            self.load_options(ctx, reuse).await;
        }

        if !ctx.is_current(tag, 0) {
            warn!("Discarding stale chart sample (generation {})", tag.generation);
            self.status = previous;
            return RefreshOutcome::Stale;
        }

        self.slices = aggregate_column(&sample, &self.attribute, self.display_limit);
        self.sample = sample;
        info!(
            "Chart '{}' built {} slices from {} records",
            self.attribute,
            self.slices.len(),
            self.sample.len()
        );
        self.status = ViewStatus::Ready;
        RefreshOutcome::Updated
    }

    fn snapshot(&self) -> Value {
        json!({
            "attribute": self.attribute,
            "sampleSize": self.sample.len(),
            "displayLimit": self.display_limit,
            "slices": self.slices,
            "options": self.options,
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
