//! Service index document and resolver.
//!
//! A feed's service index is its root document listing the API endpoints
//! ("resources") the feed exposes. The resolver fetches it through the
//! provider strategy matching the source, validates that the endpoints we
//! cannot work without are present, and caches the result per index URL.
//! Cached entries are never refreshed behind the caller's back; staleness
//! is handled by explicit invalidation only.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hazel_core::error::{HazelError, HazelResult};
use hazel_core::types::PackageSource;

use crate::providers::{ProviderRegistry, ResolutionContext};
use crate::transport::HttpPipeline;

/// Type prefix of the search endpoint resource
pub const SEARCH_QUERY_SERVICE: &str = "SearchQueryService";
/// Type prefix of the registration (metadata) base URL resource
pub const REGISTRATIONS_BASE_URL: &str = "RegistrationsBaseUrl";
/// Type prefix of the flat-container base URL resource
pub const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress";

/// A feed's service index document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceIndex {
    pub version: String,
    pub resources: Vec<ServiceResource>,
}

/// One endpoint listed in a service index
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceResource {
    #[serde(rename = "@id")]
    pub url: String,
    #[serde(rename = "@type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ServiceIndex {
    /// Find a resource by type prefix; a resource typed
    /// `SearchQueryService/3.0.0-rc` satisfies a lookup for
    /// `SearchQueryService`. First match wins.
    pub fn find_resource(&self, type_prefix: &str) -> Option<&ServiceResource> {
        self.resources
            .iter()
            .find(|resource| resource.resource_type.starts_with(type_prefix))
    }
}

/// Resolves and caches service indexes, one entry per index URL
pub struct ServiceIndexResolver {
    providers: ProviderRegistry,
    cache: DashMap<String, ServiceIndex>,
}

impl ServiceIndexResolver {
    pub fn new() -> Self {
        Self::with_registry(ProviderRegistry::new())
    }

    pub fn with_registry(providers: ProviderRegistry) -> Self {
        Self {
            providers,
            cache: DashMap::new(),
        }
    }

    /// Resolve the service index for a source, from cache when possible.
    ///
    /// A fresh resolve validates that both the search endpoint and the
    /// registration base are present; an index without them is unusable
    /// and the error surfaces rather than the index being cached.
    pub async fn resolve(
        &self,
        source: &PackageSource,
        http: &HttpPipeline,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<ServiceIndex> {
        if let Some(cached) = self.cache.get(&source.index_url) {
            debug!(index_url = %source.index_url, "service index cache hit");
            return Ok(cached.clone());
        }

        let strategy = self.providers.strategy_for(source.provider.as_deref());
        let context = ResolutionContext {
            index_url: &source.index_url,
            source,
            http,
            cancel,
        };
        let index = strategy.resolve(&context).await?;
        validate_index(&index, &source.index_url)?;

        self.cache.insert(source.index_url.clone(), index.clone());
        Ok(index)
    }

    /// URL of the search endpoint
    pub async fn search_url(
        &self,
        source: &PackageSource,
        http: &HttpPipeline,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<String> {
        let index = self.resolve(source, http, cancel).await?;
        // Presence was validated at resolve time
        index
            .find_resource(SEARCH_QUERY_SERVICE)
            .map(|resource| resource.url.clone())
            .ok_or_else(|| missing_resource(SEARCH_QUERY_SERVICE, &source.index_url))
    }

    /// Base URL of the registration (metadata) API
    pub async fn registration_base(
        &self,
        source: &PackageSource,
        http: &HttpPipeline,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<String> {
        let index = self.resolve(source, http, cancel).await?;
        index
            .find_resource(REGISTRATIONS_BASE_URL)
            .map(|resource| resource.url.clone())
            .ok_or_else(|| missing_resource(REGISTRATIONS_BASE_URL, &source.index_url))
    }

    /// Base URL of the flat container, if the feed exposes one.
    ///
    /// Absence is not an error; some feeds simply omit the capability.
    pub async fn flat_container_base(
        &self,
        source: &PackageSource,
        http: &HttpPipeline,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<Option<String>> {
        let index = self.resolve(source, http, cancel).await?;
        Ok(index
            .find_resource(PACKAGE_BASE_ADDRESS)
            .map(|resource| resource.url.clone()))
    }

    /// Drop the cached index for one index URL
    pub fn invalidate(&self, index_url: &str) {
        self.cache.remove(index_url);
    }

    /// Drop every cached index
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached indexes
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl Default for ServiceIndexResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_index(index: &ServiceIndex, index_url: &str) -> HazelResult<()> {
    for required in [SEARCH_QUERY_SERVICE, REGISTRATIONS_BASE_URL] {
        if index.find_resource(required).is_none() {
            return Err(missing_resource(required, index_url));
        }
    }
    Ok(())
}

fn missing_resource(type_prefix: &str, index_url: &str) -> HazelError {
    HazelError::api_contract(format!(
        "service index at {index_url} lists no {type_prefix} resource"
    ))
}
