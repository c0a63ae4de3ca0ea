//! Report service: failure policy on top of a query client
//!
//! Record, column-value, count and heat-aggregate fetches degrade to an empty
//! result so a view can still render. Map-pin fetches surface their failure
//! to the caller.

use std::sync::Arc;
use serde_json::Value;
use sr_core::events::events::QueryFailed;
use sr_core::{EventBus, FilterMap, QueryClient, QueryError, Record};

use crate::DataError;

/// Query client wrapper applying the degrade-or-surface policy
pub struct ReportService {
    client: Arc<dyn QueryClient>,
    event_bus: Option<Arc<EventBus>>,
}

impl ReportService {
    /// Create a new report service
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        Self {
            client,
            event_bus: None,
        }
    }

    /// Publish failures on the given bus
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// The wrapped query client
    pub fn client(&self) -> &dyn QueryClient {
        self.client.as_ref()
    }

    /// Fetch a page of records; empty on failure
    pub async fn fetch_records(&self, limit: usize, start: usize, filters: &FilterMap) -> Vec<Record> {
        let result = self.client.fetch_records(limit, start, filters).await;
        let records = self.degrade("records", result, Vec::new());
        tracing::info!("Fetched {} records (start {}, limit {})", records.len(), start, limit);
        records
    }

    /// Fetch distinct values of a column; empty on failure
    pub async fn fetch_column_values(&self, column: &str, filters: &FilterMap) -> Vec<String> {
        let result = self.client.fetch_column_values(column, filters).await;
        self.degrade("columnValues", result, Vec::new())
    }

    /// Count matching records; zero on failure
    pub async fn fetch_count(&self, filters: &FilterMap) -> u64 {
        let result = self.client.fetch_count(filters).await;
        self.degrade("count", result, 0)
    }

    /// Fetch map pins; failures are returned to the caller
    pub async fn fetch_map_points(&self, limit: usize, filters: &FilterMap) -> Result<Value, DataError> {
        self.client
            .fetch_map_points(limit, filters)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch map pins: {}", e);
                self.report_failure("mapPoints", &e);
                DataError::Query(e)
            })
    }

    /// Fetch heat map data; an empty array on failure
    pub async fn fetch_heat_aggregate(
        &self,
        limit: usize,
        column: Option<&str>,
        filters: &FilterMap,
    ) -> Value {
        let result = self.client.fetch_heat_aggregate(limit, column, filters).await;
        self.degrade("heatAggregate", result, Value::Array(Vec::new()))
    }

    fn degrade<T>(&self, operation: &str, result: Result<T, QueryError>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Fetch error ({}): {}", operation, e);
                self.report_failure(operation, &e);
                fallback
            }
        }
    }

    fn report_failure(&self, operation: &str, error: &QueryError) {
        if let Some(bus) = &self.event_bus {
            bus.publish(QueryFailed {
                operation: operation.to_string(),
                error: error.to_string(),
            });
        }
    }
}
