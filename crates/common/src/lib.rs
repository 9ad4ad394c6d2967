//! Swai Common Library
//!
//! Shared code for the Swai gateway including:
//! - Resource reference parsing and domain records
//! - Catalog client abstraction (HTTP and in-memory)
//! - Resolution cache and the aggregator built on it
//! - Question answering passthrough
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod aggregator;
pub mod assistant;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod reference;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use assistant::Assistant;
pub use cache::ResolutionCache;
pub use catalog::CatalogClient;
pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
