//! Client configuration

use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::DataError;

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "REPORTVIS_BASE_URL";

/// Configuration for the query client and the views built on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the report API (without the `/api/reports` prefix)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Rows per table page
    pub table_page_size: usize,

    /// Maximum pins requested by the map view
    pub map_limit: usize,

    /// Records sampled for dashboard charts
    pub chart_sample_limit: usize,

    /// Slices kept before the rest is folded into OTHER
    pub chart_display_limit: usize,

    /// Maximum points requested by the heat map view
    pub heatmap_limit: usize,

    /// Intensity assigned to every heat map point
    pub heat_intensity: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 20,
            table_page_size: 10,
            map_limit: 2000,
            chart_sample_limit: 5000,
            chart_display_limit: 20,
            heatmap_limit: 5000,
            heat_intensity: 0.6,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        tracing::debug!("Loaded client configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                tracing::info!("Using base URL from {}: {}", BASE_URL_ENV, base_url);
                self.base_url = base_url;
            }
        }
        self
    }

    /// Reject configurations the views cannot work with
    pub fn validate(&self) -> Result<(), DataError> {
        let limits = [
            ("table_page_size", self.table_page_size),
            ("map_limit", self.map_limit),
            ("chart_sample_limit", self.chart_sample_limit),
            ("chart_display_limit", self.chart_display_limit),
            ("heatmap_limit", self.heatmap_limit),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(DataError::Config(format!("{} must be positive", name)));
            }
        }
        if !self.heat_intensity.is_finite() || self.heat_intensity <= 0.0 {
            return Err(DataError::Config("heat_intensity must be a positive number".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(DataError::Config("base_url is empty".to_string()));
        }
        Ok(())
    }
}
