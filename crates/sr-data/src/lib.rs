//! Query clients and service wrappers for the report API

pub mod config;
pub mod service;
pub mod sources;

use sr_core::QueryError;
use thiserror::Error;

// Re-exports
pub use config::ClientConfig;
pub use service::ReportService;
pub use sources::{HttpQueryClient, MemoryQueryClient};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
