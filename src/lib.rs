// Module declarations
pub mod config;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod request_log;
pub mod retry;
pub mod scopestack;
pub mod shutdown;

// Server module (HTTP API)
pub mod server;

// Re-export models for use by the binary and integration tests
pub use models::*;
