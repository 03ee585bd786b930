//! Provider strategies for service-index resolution.
//!
//! Most feeds implement the service-index contract as specified; the rest
//! deviate in ways that need per-provider handling, from structural
//! quirks to auth-scheme fallbacks to URL guessing. Each strategy owns
//! its header construction and implements one capability: resolve a
//! service index for a source. The registry maps a source's provider tag
//! to a strategy, falling back to the spec-compliant default, and accepts
//! runtime overrides for custom providers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use hazel_core::error::{HazelError, HazelResult};
use hazel_core::types::{AuthKind, PackageSource};

use crate::index::ServiceIndex;
use crate::transport::{HttpPipeline, RequestOptions};

/// Header used for api-key auth unless the source configures its own
pub const DEFAULT_API_KEY_HEADER: &str = "X-NuGet-ApiKey";

/// Well-known provider tags
pub mod tags {
    pub const NUGET_ORG: &str = "nuget.org";
    pub const AZURE_DEVOPS: &str = "azure-devops";
    pub const GITHUB: &str = "github";
    pub const ARTIFACTORY: &str = "artifactory";
}

/// Immutable bundle handed to a strategy call; never retained
pub struct ResolutionContext<'a> {
    pub index_url: &'a str,
    pub source: &'a PackageSource,
    pub http: &'a HttpPipeline,
    pub cancel: Option<CancellationToken>,
}

impl ResolutionContext<'_> {
    /// Request options carrying the given headers and this context's
    /// cancellation token
    pub fn options(&self, headers: Vec<(String, String)>) -> RequestOptions {
        RequestOptions::new(headers, self.cancel.clone())
    }
}

/// Headers every request starts from
fn base_headers() -> Vec<(String, String)> {
    vec![("Accept".to_string(), "application/json".to_string())]
}

/// Auth headers derived from the source's configured auth kind
pub fn auth_headers(source: &PackageSource) -> Vec<(String, String)> {
    let Some(auth) = &source.auth else {
        return Vec::new();
    };
    match auth.kind {
        AuthKind::None => Vec::new(),
        AuthKind::Basic => match (&auth.username, &auth.secret) {
            (Some(username), Some(password)) => {
                let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
                vec![("Authorization".to_string(), format!("Basic {encoded}"))]
            }
            _ => Vec::new(),
        },
        AuthKind::Bearer => match &auth.secret {
            Some(token) => vec![("Authorization".to_string(), format!("Bearer {token}"))],
            None => Vec::new(),
        },
        AuthKind::ApiKey => match &auth.secret {
            Some(key) => {
                let header = auth
                    .header
                    .clone()
                    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());
                vec![(header, key.clone())]
            }
            None => Vec::new(),
        },
    }
}

/// Accept + auth headers for a request against the source's own origin
pub fn request_headers(source: &PackageSource) -> Vec<(String, String)> {
    let mut headers = base_headers();
    headers.extend(auth_headers(source));
    headers
}

/// Headers for an arbitrary target URL reached from this source.
///
/// Credentials never leave the origin of the configured index URL: a
/// target on any other origin (redirection, CDN offload, remote
/// registration pages) gets the base headers only.
pub fn scoped_headers(source: &PackageSource, target_url: &str) -> Vec<(String, String)> {
    if same_origin(&source.index_url, target_url) {
        request_headers(source)
    } else {
        base_headers()
    }
}

fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

/// One capability: resolve a service index for a source
#[async_trait]
pub trait ProviderStrategy: Send + Sync {
    async fn resolve(&self, context: &ResolutionContext<'_>) -> HazelResult<ServiceIndex>;
}

/// Spec-compliant feeds: one request, standard headers
pub struct DefaultStrategy;

#[async_trait]
impl ProviderStrategy for DefaultStrategy {
    async fn resolve(&self, context: &ResolutionContext<'_>) -> HazelResult<ServiceIndex> {
        let options = context.options(request_headers(context.source));
        context.http.get_json(context.index_url, &options).await
    }
}

/// The primary public feed; structurally checked after fetching
pub struct NugetOrgStrategy;

#[async_trait]
impl ProviderStrategy for NugetOrgStrategy {
    async fn resolve(&self, context: &ResolutionContext<'_>) -> HazelResult<ServiceIndex> {
        let index = DefaultStrategy.resolve(context).await?;
        if index.resources.is_empty() {
            return Err(HazelError::api_contract(format!(
                "service index at {} lists no resources",
                context.index_url
            )));
        }
        Ok(index)
    }
}

/// Azure DevOps feeds: bearer primary, basic fallback when a
/// username/password pair is all that was supplied; 401 responses are
/// rewritten into an actionable hint.
pub struct AzureDevOpsStrategy;

impl AzureDevOpsStrategy {
    fn headers(source: &PackageSource) -> Vec<(String, String)> {
        let mut headers = base_headers();
        if let Some(auth) = &source.auth {
            match (&auth.username, &auth.secret) {
                (None, Some(token)) => {
                    headers.push(("Authorization".to_string(), format!("Bearer {token}")));
                }
                (Some(username), Some(password)) => {
                    let encoded =
                        general_purpose::STANDARD.encode(format!("{username}:{password}"));
                    headers.push(("Authorization".to_string(), format!("Basic {encoded}")));
                }
                _ => {}
            }
        }
        headers
    }
}

#[async_trait]
impl ProviderStrategy for AzureDevOpsStrategy {
    async fn resolve(&self, context: &ResolutionContext<'_>) -> HazelResult<ServiceIndex> {
        let options = context.options(Self::headers(context.source));
        context
            .http
            .get_json(context.index_url, &options)
            .await
            .map_err(|error| match error {
                HazelError::AuthRequired { .. } => HazelError::AuthRequired {
                    hint: "Azure DevOps rejected the credentials; a Personal Access Token \
                           with packaging read scope is required"
                        .to_string(),
                },
                other => other,
            })
    }
}

/// GitHub package registry: api-key header primary, generic token-style
/// Authorization header as the fallback.
pub struct GitHubStrategy;

#[async_trait]
impl ProviderStrategy for GitHubStrategy {
    async fn resolve(&self, context: &ResolutionContext<'_>) -> HazelResult<ServiceIndex> {
        let primary = context.options(request_headers(context.source));
        let attempt = context.http.get_json(context.index_url, &primary).await;

        let secret = context
            .source
            .auth
            .as_ref()
            .and_then(|auth| auth.secret.as_deref());
        match (attempt, secret) {
            (Err(HazelError::AuthRequired { .. }), Some(secret)) => {
                debug!(index_url = context.index_url, "api-key rejected, retrying with token header");
                let mut headers = base_headers();
                headers.push(("Authorization".to_string(), format!("token {secret}")));
                let fallback = context.options(headers);
                context.http.get_json(context.index_url, &fallback).await
            }
            (outcome, _) => outcome,
        }
    }
}

/// Artifactory-style on-prem feeds: the configured URL frequently points
/// near, not at, the index document, so resolution probes a deterministic
/// candidate chain instead of a single URL.
pub struct ArtifactoryStrategy;

/// Candidate URLs probed in order. The original URL always comes first;
/// an `index.json` suffix also yields the `/v3`-injected spelling and the
/// bare `/v3` directory; a URL with neither suffix nor version segment
/// gets the default index path appended.
pub fn candidate_urls(index_url: &str) -> Vec<String> {
    let trimmed = index_url.trim_end_matches('/');
    let mut candidates = vec![trimmed.to_string()];
    if let Some(base) = trimmed.strip_suffix("/index.json") {
        if !has_version_segment(base) {
            candidates.push(format!("{base}/v3/index.json"));
            candidates.push(format!("{base}/v3"));
        }
    } else if !has_version_segment(trimmed) {
        candidates.push(format!("{trimmed}/v3/index.json"));
    }
    candidates
}

fn has_version_segment(url: &str) -> bool {
    url.split('/').any(|segment| matches!(segment, "v2" | "v3"))
}

#[async_trait]
impl ProviderStrategy for ArtifactoryStrategy {
    async fn resolve(&self, context: &ResolutionContext<'_>) -> HazelResult<ServiceIndex> {
        let headers = request_headers(context.source);
        let mut last_error = None;
        for candidate in candidate_urls(context.index_url) {
            let options = context.options(headers.clone());
            match context.http.get_json::<ServiceIndex>(&candidate, &options).await {
                Ok(index) => {
                    debug!(%candidate, "service index found");
                    return Ok(index);
                }
                // A credential rejection will not improve on another spelling
                Err(error @ HazelError::AuthRequired { .. }) => return Err(error),
                Err(error) => {
                    debug!(%candidate, %error, "candidate failed");
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| HazelError::network("no candidate URLs generated")))
    }
}

/// Maps provider tags to strategies; unknown tags get the default
pub struct ProviderRegistry {
    strategies: HashMap<String, Arc<dyn ProviderStrategy>>,
    default_strategy: Arc<dyn ProviderStrategy>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let mut strategies: HashMap<String, Arc<dyn ProviderStrategy>> = HashMap::new();
        strategies.insert(tags::NUGET_ORG.to_string(), Arc::new(NugetOrgStrategy));
        strategies.insert(tags::AZURE_DEVOPS.to_string(), Arc::new(AzureDevOpsStrategy));
        strategies.insert(tags::GITHUB.to_string(), Arc::new(GitHubStrategy));
        strategies.insert(tags::ARTIFACTORY.to_string(), Arc::new(ArtifactoryStrategy));
        Self {
            strategies,
            default_strategy: Arc::new(DefaultStrategy),
        }
    }

    /// Register or override a strategy for a provider tag
    pub fn register(&mut self, tag: impl Into<String>, strategy: Arc<dyn ProviderStrategy>) {
        self.strategies.insert(tag.into(), strategy);
    }

    /// Strategy for a provider tag; unset and unknown tags resolve to the
    /// default strategy
    pub fn strategy_for(&self, tag: Option<&str>) -> Arc<dyn ProviderStrategy> {
        tag.and_then(|tag| self.strategies.get(tag))
            .cloned()
            .unwrap_or_else(|| self.default_strategy.clone())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
