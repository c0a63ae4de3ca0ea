pub mod http_source;
pub mod memory_source;

pub use http_source::HttpQueryClient;
pub use memory_source::MemoryQueryClient;
