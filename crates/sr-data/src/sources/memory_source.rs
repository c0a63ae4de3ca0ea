//! In-memory query client
//!
//! Answers the report API operations over a fixed record set, with the same
//! semantics as the remote service: IN-lists per column, AND across columns,
//! rows ordered by id.

use ahash::AHashSet;
use async_trait::async_trait;
use serde_json::{json, Value};
use sr_core::{FilterMap, QueryClient, QueryError, Record};

/// Query client backed by a vector of records
pub struct MemoryQueryClient {
    name: String,
    records: Vec<Record>,
}

impl MemoryQueryClient {
    /// Create a new in-memory source
    pub fn new(name: impl Into<String>, mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.id);
        Self {
            name: name.into(),
            records,
        }
    }

    /// Total number of records held, ignoring filters
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching<'a>(&'a self, filters: &'a FilterMap) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| filters.matches(r))
    }

    fn check_column(column: &str) -> Result<(), QueryError> {
        if Record::has_column(column) {
            Ok(())
        } else {
            Err(QueryError::UnknownColumn(column.to_string()))
        }
    }

    fn check_filters(filters: &FilterMap) -> Result<(), QueryError> {
        for (column, _) in filters.iter() {
            Self::check_column(column)?;
        }
        Ok(())
    }
}

/// Positional map-pin row: id, complaint, descriptor, agency, latitude, longitude
fn map_pin_row(record: &Record) -> Value {
    json!([
        record.id,
        record.complaint_type,
        record.descriptor_type,
        record.agency_name,
        record.latitude,
        record.longitude,
    ])
}

#[async_trait]
impl QueryClient for MemoryQueryClient {
    async fn fetch_records(
        &self,
        limit: usize,
        start: usize,
        filters: &FilterMap,
    ) -> Result<Vec<Record>, QueryError> {
        Self::check_filters(filters)?;
        Ok(self.matching(filters).skip(start).take(limit).cloned().collect())
    }

    async fn fetch_column_values(
        &self,
        column: &str,
        filters: &FilterMap,
    ) -> Result<Vec<String>, QueryError> {
        Self::check_column(column)?;
        Self::check_filters(filters)?;

        let mut seen = AHashSet::new();
        let mut values = Vec::new();
        for record in self.matching(filters) {
            if let Some(value) = record.field(column) {
                if seen.insert(value.clone()) {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    async fn fetch_count(&self, filters: &FilterMap) -> Result<u64, QueryError> {
        Self::check_filters(filters)?;
        Ok(self.matching(filters).count() as u64)
    }

    async fn fetch_map_points(&self, limit: usize, filters: &FilterMap) -> Result<Value, QueryError> {
        Self::check_filters(filters)?;
        let rows: Vec<Value> = self.matching(filters).take(limit).map(map_pin_row).collect();
        Ok(Value::Array(rows))
    }

    async fn fetch_heat_aggregate(
        &self,
        limit: usize,
        column: Option<&str>,
        filters: &FilterMap,
    ) -> Result<Value, QueryError> {
        Self::check_filters(filters)?;
        let rows = self.matching(filters).take(limit);

        let values: Vec<Value> = match column {
            // A single selected column comes back as plain scalars
            Some(column) => {
                Self::check_column(column)?;
                rows.filter_map(|r| r.field(column)).map(Value::String).collect()
            }
            None => rows
                .map(|r| serde_json::to_value(r).map_err(|e| QueryError::Decode(e.to_string())))
                .collect::<Result<Vec<Value>, QueryError>>()?,
        };
        Ok(Value::Array(values))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
