//! Record model and the query client abstraction

mod record;

pub use record::{Record, CATEGORICAL_COLUMNS, COLUMN_ORDER};

use serde_json::Value;
use thiserror::Error;

use crate::filters::FilterMap;

/// Errors raised by a query client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

/// Trait for the remote report query API
///
/// Implementations are stateless with respect to their inputs: the same
/// operation with the same bounds and filters yields the same answer.
/// Empty filter maps must be sent as "no constraint", never as an empty object.
#[async_trait::async_trait]
pub trait QueryClient: Send + Sync {
    /// Fetch one page of records
    async fn fetch_records(
        &self,
        limit: usize,
        start: usize,
        filters: &FilterMap,
    ) -> Result<Vec<Record>, QueryError>;

    /// Fetch the distinct values of a column, scoped to the given filters
    async fn fetch_column_values(
        &self,
        column: &str,
        filters: &FilterMap,
    ) -> Result<Vec<String>, QueryError>;

    /// Count records matching the filters
    async fn fetch_count(&self, filters: &FilterMap) -> Result<u64, QueryError>;

    /// Fetch map pins; the payload shape is not fixed
    async fn fetch_map_points(&self, limit: usize, filters: &FilterMap) -> Result<Value, QueryError>;

    /// Fetch heat map data; may be rows, positional arrays or plain scalars
    async fn fetch_heat_aggregate(
        &self,
        limit: usize,
        column: Option<&str>,
        filters: &FilterMap,
    ) -> Result<Value, QueryError>;

    /// Get the source name (host or dataset label)
    fn source_name(&self) -> &str;
}
