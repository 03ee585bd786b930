//! NuGet v3 registry client for Hazel
//!
//! This crate provides the registry client core: service-index discovery
//! with per-provider quirks, concurrent multi-source search with
//! deduplication, paginated registration metadata, readme retrieval, and
//! the retry / rate-limit transport pipeline underneath.

pub mod cache;
pub mod client;
pub mod index;
pub mod metadata;
pub mod providers;
pub mod readme;
pub mod search;
pub mod transport;

// Re-export main types
pub use cache::TtlCache;
pub use client::{RegistryClient, RegistryClientBuilder};
pub use index::{ServiceIndex, ServiceIndexResolver, ServiceResource};
pub use providers::{ProviderRegistry, ProviderStrategy, ResolutionContext};
pub use search::SearchExecutor;
pub use transport::{
    HttpPipeline, HttpTransport, PipelineBuilder, RequestOptions, RetryConfig, Transport,
};

use hazel_core::error::HazelError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, HazelError>;
