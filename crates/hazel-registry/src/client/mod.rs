//! Client facade over the registry subsystems.
//!
//! Owns the configured sources and the shared plumbing (transport
//! pipeline, service-index resolver, fetchers), and exposes the public
//! API surface: search, package index, version details, readme. Every
//! cache lives on this value; two clients never share state, so tests
//! and hosts can construct isolated instances freely.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use hazel_core::error::{HazelError, HazelResult};
use hazel_core::types::{
    PackageIndex, PackageSearchResult, PackageSource, PackageVersionDetails, SearchOptions,
};

use crate::index::ServiceIndexResolver;
use crate::metadata::{MetadataFetcher, INDEX_CACHE_SIZE, INDEX_CACHE_TTL};
use crate::providers::{ProviderRegistry, ProviderStrategy};
use crate::readme::ReadmeFetcher;
use crate::search::SearchExecutor;
use crate::transport::{HttpTransport, PipelineBuilder, RetryConfig, Transport};

/// Default minimum spacing between dispatches
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// The registry client facade
pub struct RegistryClient {
    sources: Vec<PackageSource>,
    resolver: Arc<ServiceIndexResolver>,
    search: SearchExecutor,
    metadata: MetadataFetcher,
    readme: ReadmeFetcher,
}

impl RegistryClient {
    /// Client over the given sources with default middleware
    pub fn new(sources: Vec<PackageSource>) -> HazelResult<Self> {
        Self::builder(sources).build()
    }

    pub fn builder(sources: Vec<PackageSource>) -> RegistryClientBuilder {
        RegistryClientBuilder::new(sources)
    }

    /// The configured sources, as supplied
    pub fn sources(&self) -> &[PackageSource] {
        &self.sources
    }

    /// Search packages.
    ///
    /// With an explicit source id only that source is queried; otherwise
    /// every enabled source is queried concurrently and the merged,
    /// deduplicated result is returned.
    pub async fn search(
        &self,
        options: &SearchOptions,
        source_id: Option<&str>,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<Vec<PackageSearchResult>> {
        match source_id {
            Some(id) => {
                self.search
                    .search_source(self.select_source(id)?, options, cancel)
                    .await
            }
            None => self.search.search_all(&self.sources, options, cancel).await,
        }
    }

    /// Fetch the version index for a package.
    ///
    /// Without an explicit source id, enabled sources are tried in
    /// configured order and the first success wins.
    pub async fn package_index(
        &self,
        id: &str,
        source_id: Option<&str>,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<PackageIndex> {
        if let Some(source_id) = source_id {
            return self
                .metadata
                .package_index(self.select_source(source_id)?, id, cancel)
                .await;
        }
        let mut first_error = None;
        for source in self.enabled_sources() {
            match self.metadata.package_index(source, id, cancel.clone()).await {
                Ok(index) => return Ok(index),
                Err(error) => {
                    warn!(source = %source.id, %error, "package index lookup failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| no_enabled_sources(id)))
    }

    /// Fetch full metadata for one package version
    pub async fn version_details(
        &self,
        id: &str,
        version: &str,
        source_id: Option<&str>,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<PackageVersionDetails> {
        if let Some(source_id) = source_id {
            return self
                .metadata
                .version_details(self.select_source(source_id)?, id, version, cancel)
                .await;
        }
        let mut first_error = None;
        for source in self.enabled_sources() {
            match self
                .metadata
                .version_details(source, id, version, cancel.clone())
                .await
            {
                Ok(details) => return Ok(details),
                Err(error) => {
                    warn!(source = %source.id, %error, "version details lookup failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| no_enabled_sources(id)))
    }

    /// Fetch the readme for one package version
    pub async fn readme(
        &self,
        id: &str,
        version: &str,
        source_id: Option<&str>,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<String> {
        if let Some(source_id) = source_id {
            return self
                .readme
                .readme(self.select_source(source_id)?, id, version, cancel)
                .await;
        }
        let mut first_error = None;
        for source in self.enabled_sources() {
            match self.readme.readme(source, id, version, cancel.clone()).await {
                Ok(content) => return Ok(content),
                Err(error) => {
                    warn!(source = %source.id, %error, "readme lookup failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| no_enabled_sources(id)))
    }

    /// Drop the cached service index for one index URL
    pub fn invalidate_index(&self, index_url: &str) {
        self.resolver.invalidate(index_url);
    }

    /// Drop every cached service index and memoized package index
    pub fn clear_caches(&self) {
        self.resolver.clear();
        self.metadata.clear_cache();
    }

    fn select_source(&self, source_id: &str) -> HazelResult<&PackageSource> {
        self.sources
            .iter()
            .find(|source| source.id == source_id && source.enabled)
            .ok_or_else(|| HazelError::not_found(format!("enabled source '{source_id}'")))
    }

    fn enabled_sources(&self) -> impl Iterator<Item = &PackageSource> {
        self.sources.iter().filter(|source| source.enabled)
    }
}

fn no_enabled_sources(id: &str) -> HazelError {
    HazelError::not_found(format!("package '{id}' (no enabled sources configured)"))
}

/// Configures and builds a [`RegistryClient`]
pub struct RegistryClientBuilder {
    sources: Vec<PackageSource>,
    retry: RetryConfig,
    rate_limit: Duration,
    timeout: Duration,
    providers: ProviderRegistry,
    index_cache_size: usize,
    index_cache_ttl: Duration,
    transport: Option<Arc<dyn Transport>>,
}

impl RegistryClientBuilder {
    pub fn new(sources: Vec<PackageSource>) -> Self {
        Self {
            sources,
            retry: RetryConfig::default(),
            rate_limit: DEFAULT_RATE_LIMIT,
            timeout: crate::transport::DEFAULT_TIMEOUT,
            providers: ProviderRegistry::new(),
            index_cache_size: INDEX_CACHE_SIZE,
            index_cache_ttl: INDEX_CACHE_TTL,
            transport: None,
        }
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limit = min_interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register or override a provider strategy
    pub fn provider_strategy(
        mut self,
        tag: impl Into<String>,
        strategy: Arc<dyn ProviderStrategy>,
    ) -> Self {
        self.providers.register(tag, strategy);
        self
    }

    pub fn metadata_cache(mut self, size: usize, ttl: Duration) -> Self {
        self.index_cache_size = size;
        self.index_cache_ttl = ttl;
        self
    }

    /// Replace the base transport (custom stacks, tests)
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> HazelResult<RegistryClient> {
        let base: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::with_timeout(self.timeout)?),
        };
        let http = PipelineBuilder::new(base)
            .with_retry(self.retry)
            .with_rate_limit(self.rate_limit)
            .build();

        let resolver = Arc::new(ServiceIndexResolver::with_registry(self.providers));
        let search = SearchExecutor::new(http.clone(), resolver.clone());
        let metadata = MetadataFetcher::with_cache(
            http.clone(),
            resolver.clone(),
            self.index_cache_size,
            self.index_cache_ttl,
        );
        let readme = ReadmeFetcher::new(http, resolver.clone());

        Ok(RegistryClient {
            sources: self.sources,
            resolver,
            search,
            metadata,
            readme,
        })
    }
}
