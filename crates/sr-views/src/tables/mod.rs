//! Table view implementation
//!
//! Paged record table with confirm-before-apply column filters: dropdown
//! toggles go to the staged filters and only reach the query once applied.

use serde_json::{json, Value};
use sr_core::{Pager, Record};
use sr_data::ClientConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{RefreshOutcome, RequestTag, SpaceView, SpaceViewId, ViewError, ViewStatus, ViewerContext};

/// Table view that displays one page of records
pub struct TableView {
    id: SpaceViewId,
    title: String,
    pager: Pager,
    rows: Vec<Record>,
    status: ViewStatus,

    // Filter dropdown
    open_filter: Option<String>,
    filter_values: Vec<String>,

    /// Filter generation the current rows were fetched for
    last_generation: Option<u64>,
}

impl TableView {
    /// Create a new table view
    pub fn new(title: impl Into<String>, page_size: usize) -> Result<Self, ViewError> {
        Ok(Self {
            id: Uuid::new_v4(),
            title: title.into(),
            pager: Pager::new(page_size)?,
            rows: Vec::new(),
            status: ViewStatus::Idle,
            open_filter: None,
            filter_values: Vec::new(),
            last_generation: None,
        })
    }

    pub fn from_config(title: impl Into<String>, config: &ClientConfig) -> Result<Self, ViewError> {
        Self::new(title, config.table_page_size)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Column whose filter dropdown is open
    pub fn open_filter_column(&self) -> Option<&str> {
        self.open_filter.as_deref()
    }

    /// Candidate values shown in the open dropdown
    pub fn filter_values(&self) -> &[String] {
        &self.filter_values
    }

    /// 1-based range of rows on screen, for "Showing start-end of total"
    pub fn record_range(&self) -> Option<(usize, usize)> {
        self.pager.record_range(self.rows.len())
    }

    /// Open the dropdown for `column`, or close it if already open
    ///
    /// Values are scoped to the other applied filters and served from the
    /// shared cache when still valid.
    pub async fn open_filter(&mut self, ctx: &ViewerContext, column: &str) -> Result<(), ViewError> {
        if !Record::has_column(column) {
            return Err(ViewError::UnknownColumn(column.to_string()));
        }

        if self.open_filter.as_deref() == Some(column) {
            self.close_filter();
            return Ok(());
        }

        self.open_filter = Some(column.to_string());
        self.filter_values = ctx.filters.get_column_values(column, ctx.service.client()).await;
        debug!("Opened filter '{}' with {} values", column, self.filter_values.len());
        Ok(())
    }

    pub fn close_filter(&mut self) {
        self.open_filter = None;
        self.filter_values.clear();
    }

    /// Toggle a value in the staged filters; returns whether it is now selected
    pub fn toggle_staged(&self, ctx: &ViewerContext, column: &str, value: &str) -> bool {
        ctx.filters.toggle_staged(column, value)
    }

    /// Promote staged filters and go back to the first page
    pub fn apply_filters(&mut self, ctx: &ViewerContext) {
        let generation = ctx.filters.apply_staged();
        self.pager.first();
        self.close_filter();
        self.last_generation = Some(generation);
    }

    /// Drop staged edits, leaving the query untouched
    pub fn clear_staged(&self, ctx: &ViewerContext) {
        ctx.filters.clear_staged();
    }

    /// Clear every filter, staged and applied
    pub fn clear_filters(&mut self, ctx: &ViewerContext) {
        ctx.filters.clear_all();
        self.pager.first();
        self.close_filter();
        self.last_generation = Some(ctx.filters.generation());
    }

    /// Clear one column's filter from both maps
    pub fn clear_column_filter(&mut self, ctx: &ViewerContext, column: &str) {
        ctx.filters.clear_column(column);
        self.pager.first();
        self.last_generation = Some(ctx.filters.generation());
    }

    pub fn next_page(&mut self) {
        self.pager.next();
    }

    pub fn previous_page(&mut self) {
        self.pager.previous();
    }

    pub fn first_page(&mut self) {
        self.pager.first();
    }

    /// Jump to a page typed by the user (1-based)
    pub fn go_to_page(&mut self, input: &str) -> Result<(), ViewError> {
        self.pager.go_to_input(input)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SpaceView for TableView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "TableView"
    }

    fn status(&self) -> &ViewStatus {
        &self.status
    }

    async fn refresh(&mut self, ctx: &ViewerContext) -> RefreshOutcome {
        let (filters, generation) = ctx.filters.applied_with_generation();

        // Filters changed elsewhere since the last load
        if self.last_generation.is_some_and(|g| g != generation) {
            debug!("Applied filters changed, back to first page");
            self.pager.first();
        }

        let tag = RequestTag {
            generation,
            page: self.pager.page(),
        };
        let previous = std::mem::replace(&mut self.status, ViewStatus::Loading);

        let (limit, start) = (self.pager.page_size(), self.pager.offset());
        let (rows, total) = tokio::join!(
            ctx.service.fetch_records(limit, start, &filters),
            ctx.service.fetch_count(&filters),
        );

        if !ctx.is_current(tag, self.pager.page()) {
            warn!("Discarding stale table page {} (generation {})", start / limit, generation);
            self.status = previous;
            return RefreshOutcome::Stale;
        }

        info!("Table page {} loaded: {} rows of {}", self.pager.page() + 1, rows.len(), total);
        self.rows = rows;
        self.pager.set_total_records(total);
        self.last_generation = Some(generation);
        self.status = ViewStatus::Ready;
        RefreshOutcome::Updated
    }

    fn snapshot(&self) -> Value {
        json!({
            "page": self.pager.page() + 1,
            "totalPages": self.pager.total_pages(),
            "totalRecords": self.pager.total_records(),
            "range": self.record_range(),
            "rows": self.rows,
            "openFilter": self.open_filter,
            "filterValues": self.filter_values,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sr_core::FilterState;
    use sr_data::{MemoryQueryClient, ReportService};

    fn context(count: i64) -> ViewerContext {
        let records = (1..=count)
            .map(|id| Record {
                id,
                borough: if id % 2 == 0 { "BRONX" } else { "QUEENS" }.to_string(),
                ..Default::default()
            })
            .collect();
        let client = Arc::new(MemoryQueryClient::new("test", records));
        ViewerContext::new(
            Arc::new(FilterState::new()),
            Arc::new(ReportService::new(client)),
            Arc::new(ClientConfig::default()),
        )
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(matches!(TableView::new("t", 0), Err(ViewError::Paging(_))));
    }

    #[tokio::test]
    async fn test_refresh_loads_page_and_count() {
        let ctx = context(25);
        let mut table = TableView::from_config("Reports", &ctx.config).unwrap();

        assert_eq!(table.refresh(&ctx).await, RefreshOutcome::Updated);
        assert_eq!(table.rows().len(), 10);
        assert_eq!(table.pager().total_pages(), 3);
        assert_eq!(table.record_range(), Some((1, 10)));

        table.go_to_page("3").unwrap();
        table.refresh(&ctx).await;
        assert_eq!(table.rows().len(), 5);
        assert_eq!(table.record_range(), Some((21, 25)));
        assert_eq!(table.status(), &ViewStatus::Ready);
    }

    #[tokio::test]
    async fn test_staged_filters_do_not_query_until_applied() {
        let ctx = context(20);
        let mut table = TableView::new("Reports", 10).unwrap();
        table.next_page();

        assert!(table.toggle_staged(&ctx, "borough", "BRONX"));
        table.refresh(&ctx).await;
        assert_eq!(table.pager().total_records(), 20);
        assert_eq!(table.pager().page(), 1);

        table.apply_filters(&ctx);
        assert_eq!(table.pager().page(), 0);
        table.refresh(&ctx).await;
        assert_eq!(table.pager().total_records(), 10);
        assert!(table.rows().iter().all(|r| r.borough == "BRONX"));
    }

    #[tokio::test]
    async fn test_open_filter_toggles_dropdown() {
        let ctx = context(4);
        let mut table = TableView::new("Reports", 10).unwrap();

        table.open_filter(&ctx, "borough").await.unwrap();
        assert_eq!(table.open_filter_column(), Some("borough"));
        assert_eq!(table.filter_values(), ["QUEENS", "BRONX"]);

        table.open_filter(&ctx, "borough").await.unwrap();
        assert_eq!(table.open_filter_column(), None);
        assert!(table.filter_values().is_empty());

        let err = table.open_filter(&ctx, "nope").await;
        assert_eq!(err, Err(ViewError::UnknownColumn("nope".to_string())));
    }

    #[tokio::test]
    async fn test_external_filter_change_resets_page() {
        let ctx = context(30);
        let mut table = TableView::new("Reports", 10).unwrap();
        table.refresh(&ctx).await;
        table.next_page();
        table.next_page();
        table.refresh(&ctx).await;
        assert_eq!(table.pager().page(), 2);

        // Another view applies a filter directly
        ctx.filters.toggle_applied("borough", "QUEENS");
        table.refresh(&ctx).await;
        assert_eq!(table.pager().page(), 0);
        assert_eq!(table.pager().total_records(), 15);
    }

    #[tokio::test]
    async fn test_clear_column_filter() {
        let ctx = context(10);
        let mut table = TableView::new("Reports", 10).unwrap();
        table.toggle_staged(&ctx, "borough", "BRONX");
        table.apply_filters(&ctx);
        table.next_page();

        table.clear_column_filter(&ctx, "borough");
        assert_eq!(table.pager().page(), 0);
        assert!(ctx.filters.applied().is_empty());
        assert!(ctx.filters.staged().is_empty());

        table.refresh(&ctx).await;
        assert_eq!(table.pager().total_records(), 10);
    }
}
