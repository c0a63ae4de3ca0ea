//! HTTP query client for the report API

use std::time::Duration;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sr_core::{FilterMap, QueryClient, QueryError, Record};

use crate::{ClientConfig, DataError};

/// Query client talking to `<base_url>/api/reports/*`
pub struct HttpQueryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQueryClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::Config(format!("http client init failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL of an endpoint under the reports API
    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/reports/{}", self.base_url, path)
    }

    /// Issue a GET request and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, QueryError> {
        let url = self.endpoint(path);
        tracing::debug!("Fetching from: {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| QueryError::Transport(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                endpoint: url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| QueryError::Transport(format!("{}: {}", url, e)))?;
        decode_body(&url, &body)
    }
}

/// Decode a JSON response body
fn decode_body<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, QueryError> {
    serde_json::from_slice(body).map_err(|e| QueryError::Decode(format!("{}: {}", url, e)))
}

/// `SELECT DISTINCT` yields null for blank columns; show them as blanks
fn blank_nulls(values: Vec<Option<String>>) -> Vec<String> {
    values.into_iter().map(Option::unwrap_or_default).collect()
}

/// Append the filter parameter only when there is something to send
fn push_filters(params: &mut Vec<(&'static str, String)>, key: &'static str, filters: &FilterMap) {
    if let Some(serialized) = filters.to_query_param() {
        params.push((key, serialized));
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn fetch_records(
        &self,
        limit: usize,
        start: usize,
        filters: &FilterMap,
    ) -> Result<Vec<Record>, QueryError> {
        let mut params = vec![("limit", limit.to_string()), ("start", start.to_string())];
        push_filters(&mut params, "filters", filters);
        self.get_json("all", &params).await
    }

    async fn fetch_column_values(
        &self,
        column: &str,
        filters: &FilterMap,
    ) -> Result<Vec<String>, QueryError> {
        let mut params = vec![("columnName", column.to_string())];
        push_filters(&mut params, "currentFilters", filters);
        let values: Vec<Option<String>> = self.get_json("columnFilter", &params).await?;
        Ok(blank_nulls(values))
    }

    async fn fetch_count(&self, filters: &FilterMap) -> Result<u64, QueryError> {
        let mut params = Vec::new();
        push_filters(&mut params, "currentFilters", filters);
        self.get_json("count", &params).await
    }

    async fn fetch_map_points(&self, limit: usize, filters: &FilterMap) -> Result<Value, QueryError> {
        let mut params = vec![("limit", limit.to_string())];
        push_filters(&mut params, "currentFilters", filters);
        self.get_json("mapDisplay", &params).await
    }

    async fn fetch_heat_aggregate(
        &self,
        limit: usize,
        column: Option<&str>,
        filters: &FilterMap,
    ) -> Result<Value, QueryError> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(column) = column {
            params.push(("column", column.to_string()));
        }
        push_filters(&mut params, "currentFilters", filters);
        self.get_json("heatMap", &params).await
    }

    fn source_name(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = ClientConfig {
            base_url: "http://reports.local:8080/".to_string(),
            ..Default::default()
        };
        let client = HttpQueryClient::new(&config).unwrap();

        assert_eq!(client.endpoint("count"), "http://reports.local:8080/api/reports/count");
        assert_eq!(client.source_name(), "http://reports.local:8080");
    }

    #[test]
    fn test_filters_param_skipped_when_empty() {
        let mut params = Vec::new();
        push_filters(&mut params, "currentFilters", &FilterMap::new());
        assert!(params.is_empty());

        let mut filters = FilterMap::new();
        filters.toggle("borough", "BRONX");
        push_filters(&mut params, "currentFilters", &filters);
        assert_eq!(params, vec![("currentFilters", r#"{"borough":["BRONX"]}"#.to_string())]);
    }

    #[test]
    fn test_decode_records_with_null_columns() {
        let body = br#"[
            {"id": 101, "complaintType": "Noise - Residential", "descriptorType": "Loud Music/Party",
             "agencyName": "NYPD", "locationType": null, "incidentAddress": "1 MAIN ST",
             "incidentZip": null, "addressType": "ADDRESS", "city": "BRONX", "status": "Open",
             "createdDate": "2025-11-30 00:00:00", "closedDate": null, "communityBoard": null,
             "borough": "BRONX", "openDataChannelType": "PHONE", "latitude": 40.84, "longitude": -73.88},
            {"id": 102, "complaintType": "HEAT/HOT WATER", "descriptorType": null,
             "status": "Closed", "closedDate": "2025-12-01 08:00:00",
             "latitude": null, "longitude": null}
        ]"#;

        let records: Vec<Record> = decode_body("all", body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].closed_date, "");
        assert_eq!(records[0].location_type, "");
        assert_eq!(records[0].latitude, Some(40.84));
        assert_eq!(records[1].descriptor_type, "");
        assert_eq!(records[1].longitude, None);
    }

    #[test]
    fn test_decode_column_values_with_null() {
        let body = br#"["BRONX", null, "QUEENS"]"#;
        let raw: Vec<Option<String>> = decode_body("columnFilter", body).unwrap();
        assert_eq!(blank_nulls(raw), vec!["BRONX", "", "QUEENS"]);
    }

    #[test]
    fn test_decode_failure_names_endpoint() {
        let result: Result<u64, QueryError> = decode_body("count", b"\"many\"");
        assert!(matches!(result, Err(QueryError::Decode(message)) if message.starts_with("count")));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = HttpQueryClient::new(&config).unwrap();

        let result = client.fetch_count(&FilterMap::new()).await;
        assert!(matches!(result, Err(QueryError::Transport(_))));
    }
}
