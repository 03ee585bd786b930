//! Package metadata retrieval over the registration API.
//!
//! The registration document tree is paginated: the index lists pages,
//! each page either carries its leaves inline or is a remote reference
//! that needs a secondary fetch. One malformed leaf is logged and skipped
//! so a single bad entry cannot take down a whole version listing; a leaf
//! that is missing fields the protocol guarantees (catalog entry, id,
//! version) on a direct details request is a contract violation and
//! fails the call.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use hazel_core::error::{HazelError, HazelResult};
use hazel_core::types::{
    compare_frameworks, compare_versions, DependencyGroup, Deprecation, DeprecationReason,
    PackageDependency, PackageIndex, PackageSource, PackageVersionDetails, PackageVersionSummary,
    Severity, Vulnerability,
};

use crate::cache::TtlCache;
use crate::index::ServiceIndexResolver;
use crate::providers::scoped_headers;
use crate::search::normalize_string_list;
use crate::transport::{HttpPipeline, RequestOptions};

/// Default bound on memoized package indexes
pub const INDEX_CACHE_SIZE: usize = 100;
/// Default lifetime of a memoized package index
pub const INDEX_CACHE_TTL: Duration = Duration::from_secs(300);

/// Fetches package version listings and per-version details
pub struct MetadataFetcher {
    http: HttpPipeline,
    resolver: Arc<ServiceIndexResolver>,
    /// Package indexes change as versions publish; bounded TTL memoization
    index_cache: Mutex<TtlCache<String, PackageIndex>>,
}

impl MetadataFetcher {
    pub fn new(http: HttpPipeline, resolver: Arc<ServiceIndexResolver>) -> Self {
        Self::with_cache(http, resolver, INDEX_CACHE_SIZE, INDEX_CACHE_TTL)
    }

    pub fn with_cache(
        http: HttpPipeline,
        resolver: Arc<ServiceIndexResolver>,
        cache_size: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http,
            resolver,
            index_cache: Mutex::new(TtlCache::new(cache_size, cache_ttl)),
        }
    }

    /// Fetch the version index for a package, walking every catalog page
    pub async fn package_index(
        &self,
        source: &PackageSource,
        id: &str,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<PackageIndex> {
        let cache_key = format!("{}::{}", source.id, id.to_lowercase());
        if let Some(cached) = self.index_cache.lock().get(&cache_key) {
            debug!(package = id, "package index cache hit");
            return Ok(cached);
        }

        let base = self
            .resolver
            .registration_base(source, &self.http, cancel.clone())
            .await?;
        let url = format!(
            "{}/{}/index.json",
            base.trim_end_matches('/'),
            id.to_lowercase()
        );
        let request = RequestOptions::new(scoped_headers(source, &url), cancel.clone());
        let document: Value = self
            .http
            .get_json(&url, &request)
            .await
            .map_err(|error| upgrade_not_found(error, format!("package '{id}'")))?;

        let mut versions = Vec::new();
        let pages = document
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for page in &pages {
            let leaves = match page.get("items").and_then(Value::as_array) {
                Some(inline) => inline.clone(),
                None => self.fetch_remote_page(source, page, cancel.clone()).await?,
            };
            for leaf in &leaves {
                match parse_version_summary(leaf) {
                    Some(summary) => versions.push(summary),
                    None => warn!(package = id, "skipping malformed registration item"),
                }
            }
        }
        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));

        let index = PackageIndex {
            id: id.to_string(),
            count: versions.len(),
            versions,
        };
        self.index_cache.lock().insert(cache_key, index.clone());
        Ok(index)
    }

    /// Fetch full metadata for one version of a package
    pub async fn version_details(
        &self,
        source: &PackageSource,
        id: &str,
        version: &str,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<PackageVersionDetails> {
        let base = self
            .resolver
            .registration_base(source, &self.http, cancel.clone())
            .await?;
        let url = format!(
            "{}/{}/{}.json",
            base.trim_end_matches('/'),
            id.to_lowercase(),
            version.to_lowercase()
        );
        let request = RequestOptions::new(scoped_headers(source, &url), cancel.clone());
        let leaf: Value = self.http.get_json(&url, &request).await.map_err(|error| {
            upgrade_not_found(error, format!("package '{id}' version '{version}'"))
        })?;

        // The catalog entry is inline or a URL needing a secondary fetch
        let catalog = match leaf.get("catalogEntry") {
            Some(Value::String(catalog_url)) => {
                debug!(package = id, version, "fetching remote catalog entry");
                let request =
                    RequestOptions::new(scoped_headers(source, catalog_url), cancel.clone());
                self.http.get_json::<Value>(catalog_url, &request).await?
            }
            Some(inline @ Value::Object(_)) => inline.clone(),
            _ => {
                return Err(HazelError::parse(format!(
                    "registration leaf for {id} {version} has no catalog entry"
                )))
            }
        };

        parse_version_details(&leaf, &catalog)
    }

    /// Drop the memoized index for one package on one source
    pub fn invalidate(&self, source_id: &str, package_id: &str) {
        let cache_key = format!("{}::{}", source_id, package_id.to_lowercase());
        self.index_cache.lock().remove(&cache_key);
    }

    /// Drop every memoized package index
    pub fn clear_cache(&self) {
        self.index_cache.lock().clear();
    }

    async fn fetch_remote_page(
        &self,
        source: &PackageSource,
        page: &Value,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<Vec<Value>> {
        let Some(page_url) = page.get("@id").and_then(Value::as_str) else {
            warn!("skipping registration page without inline items or a page URL");
            return Ok(Vec::new());
        };
        let request = RequestOptions::new(scoped_headers(source, page_url), cancel);
        let remote: Value = self.http.get_json(page_url, &request).await?;
        Ok(remote
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

/// Parse one registration leaf into a version summary; `None` marks a
/// malformed item for the caller to log and skip.
fn parse_version_summary(leaf: &Value) -> Option<PackageVersionSummary> {
    let catalog = leaf.get("catalogEntry")?;
    let version = catalog.get("version")?.as_str()?.to_string();
    Some(PackageVersionSummary {
        version,
        downloads: catalog.get("downloads").and_then(Value::as_u64),
        registration_url: leaf
            .get("@id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content_url: leaf
            .get("packageContent")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        listed: catalog.get("listed").and_then(Value::as_bool).unwrap_or(true),
    })
}

fn parse_version_details(leaf: &Value, catalog: &Value) -> HazelResult<PackageVersionDetails> {
    // id and version are protocol-mandated on a catalog entry
    let id = catalog
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| HazelError::parse("catalog entry is missing its package id"))?;
    let version = catalog
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| HazelError::parse("catalog entry is missing its version"))?;

    let mut dependency_groups = parse_dependency_groups(catalog.get("dependencyGroups"));
    sort_dependency_groups(&mut dependency_groups);

    Ok(PackageVersionDetails {
        id: id.to_string(),
        version: version.to_string(),
        description: catalog
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        authors: normalize_string_list(catalog.get("authors"), &[',']),
        tags: normalize_string_list(catalog.get("tags"), &[' ', '\t']),
        license_expression: string_field(catalog, "licenseExpression"),
        license_url: string_field(catalog, "licenseUrl"),
        icon_url: string_field(catalog, "iconUrl"),
        project_url: string_field(catalog, "projectUrl"),
        readme_url: string_field(catalog, "readmeUrl"),
        content_url: string_field(leaf, "packageContent").or_else(|| string_field(catalog, "packageContent")),
        listed: catalog.get("listed").and_then(Value::as_bool).unwrap_or(true),
        dependency_groups,
        deprecation: parse_deprecation(catalog.get("deprecation")),
        vulnerabilities: parse_vulnerabilities(catalog.get("vulnerabilities")),
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

fn parse_dependency_groups(value: Option<&Value>) -> Vec<DependencyGroup> {
    let Some(groups) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    groups
        .iter()
        .map(|group| DependencyGroup {
            // An absent moniker means the group applies to any framework
            target_framework: group
                .get("targetFramework")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string(),
            dependencies: group
                .get("dependencies")
                .and_then(Value::as_array)
                .map(|dependencies| {
                    dependencies
                        .iter()
                        .filter_map(|dependency| {
                            Some(PackageDependency {
                                id: dependency.get("id")?.as_str()?.to_string(),
                                range: dependency
                                    .get("range")
                                    .and_then(Value::as_str)
                                    .unwrap_or("")
                                    .to_string(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

/// Highest-precedence framework first, the "any framework" group last
fn sort_dependency_groups(groups: &mut [DependencyGroup]) {
    groups.sort_by(|a, b| {
        match (a.target_framework.is_empty(), b.target_framework.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_frameworks(&b.target_framework, &a.target_framework),
        }
    });
}

fn parse_deprecation(value: Option<&Value>) -> Option<Deprecation> {
    let deprecation = value?.as_object()?;
    let reasons = deprecation
        .get("reasons")
        .and_then(Value::as_array)
        .map(|reasons| {
            reasons
                .iter()
                .filter_map(Value::as_str)
                // Unrecognized reasons are dropped, not errored
                .filter_map(DeprecationReason::from_wire)
                .collect()
        })
        .unwrap_or_default();
    Some(Deprecation {
        reasons,
        message: deprecation
            .get("message")
            .and_then(Value::as_str)
            .map(String::from),
        alternate: deprecation.get("alternatePackage").and_then(|alternate| {
            Some(PackageDependency {
                id: alternate.get("id")?.as_str()?.to_string(),
                range: alternate
                    .get("range")
                    .and_then(Value::as_str)
                    .unwrap_or("*")
                    .to_string(),
            })
        }),
    })
}

fn parse_vulnerabilities(value: Option<&Value>) -> Vec<Vulnerability> {
    let Some(vulnerabilities) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    vulnerabilities
        .iter()
        .map(|vulnerability| Vulnerability {
            advisory_url: vulnerability
                .get("advisoryUrl")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            severity: decode_severity(vulnerability.get("severity")),
        })
        .collect()
}

/// Severity arrives as a number or a numeric string depending on the feed
fn decode_severity(value: Option<&Value>) -> Severity {
    let code = match value {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.parse().ok(),
        _ => None,
    };
    Severity::from_code(code.unwrap_or(0))
}

/// Upgrade a generic 404 into a domain-level absence
pub(crate) fn upgrade_not_found(error: HazelError, resource: String) -> HazelError {
    match error {
        HazelError::Api {
            status: Some(404), ..
        } => HazelError::NotFound { resource },
        other => other,
    }
}

#[cfg(test)]
mod tests;
