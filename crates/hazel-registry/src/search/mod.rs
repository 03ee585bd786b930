//! Package search across one or many sources.
//!
//! Single-source search resolves the feed's search endpoint, builds the
//! query, and normalizes the response into `PackageSearchResult` values.
//! Multi-source search fans out one request per enabled source
//! concurrently, merges the successes, and deduplicates by
//! case-insensitive package id keeping the highest version.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use hazel_core::error::{HazelError, HazelResult};
use hazel_core::types::{compare_versions, PackageSearchResult, PackageSource, SearchOptions};

use crate::index::ServiceIndexResolver;
use crate::providers::scoped_headers;
use crate::transport::{HttpPipeline, RequestOptions};

/// Executes searches against configured sources
pub struct SearchExecutor {
    http: HttpPipeline,
    resolver: Arc<ServiceIndexResolver>,
}

#[derive(Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    data: Vec<Value>,
}

impl SearchExecutor {
    pub fn new(http: HttpPipeline, resolver: Arc<ServiceIndexResolver>) -> Self {
        Self { http, resolver }
    }

    /// Search a single source
    pub async fn search_source(
        &self,
        source: &PackageSource,
        options: &SearchOptions,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<Vec<PackageSearchResult>> {
        let endpoint = self
            .resolver
            .search_url(source, &self.http, cancel.clone())
            .await?;
        let url = build_search_url(&endpoint, options)?;
        let request = RequestOptions::new(scoped_headers(source, &url), cancel);

        let response: RawSearchResponse = self.http.get_json(&url, &request).await?;
        let results: Vec<PackageSearchResult> = response
            .data
            .iter()
            .filter_map(normalize_entry)
            .collect();
        debug!(source = %source.id, count = results.len(), "search complete");
        Ok(results)
    }

    /// Search every enabled source concurrently and merge the results.
    ///
    /// A failing source never cancels the others; its error is logged and
    /// the merge proceeds with whatever succeeded. Only when every source
    /// fails does the first error surface. With no enabled sources the
    /// result is simply empty.
    pub async fn search_all(
        &self,
        sources: &[PackageSource],
        options: &SearchOptions,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<Vec<PackageSearchResult>> {
        let enabled: Vec<&PackageSource> = sources.iter().filter(|s| s.enabled).collect();
        if enabled.is_empty() {
            return Ok(Vec::new());
        }

        let outcomes = join_all(
            enabled
                .iter()
                .map(|source| self.search_source(source, options, cancel.clone())),
        )
        .await;

        let mut merged = Vec::new();
        let mut first_error = None;
        let mut any_success = false;
        for (source, outcome) in enabled.iter().zip(outcomes) {
            match outcome {
                Ok(results) => {
                    any_success = true;
                    merged.extend(results);
                }
                Err(error) => {
                    warn!(source = %source.id, %error, "search failed for source");
                    first_error.get_or_insert(error);
                }
            }
        }

        if !any_success {
            if let Some(error) = first_error {
                return Err(error);
            }
        }
        Ok(dedupe_by_id(merged))
    }
}

/// Append the search query parameters with their documented defaults
fn build_search_url(endpoint: &str, options: &SearchOptions) -> HazelResult<String> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| HazelError::parse(format!("Invalid search endpoint {endpoint}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("q", options.query.as_deref().unwrap_or(""))
        .append_pair("skip", &options.skip.unwrap_or(0).to_string())
        .append_pair(
            "take",
            &options.take.unwrap_or(SearchOptions::DEFAULT_TAKE).to_string(),
        )
        .append_pair(
            "prerelease",
            if options.prerelease.unwrap_or(false) {
                "true"
            } else {
                "false"
            },
        )
        .append_pair(
            "semVerLevel",
            options
                .sem_ver_level
                .as_deref()
                .unwrap_or(SearchOptions::DEFAULT_SEM_VER_LEVEL),
        );
    Ok(url.into())
}

/// Normalize one raw search entry; entries without an id or version are
/// dropped rather than surfaced half-empty.
pub(crate) fn normalize_entry(entry: &Value) -> Option<PackageSearchResult> {
    let id = entry.get("id")?.as_str()?.to_string();
    let version = entry.get("version")?.as_str()?.to_string();

    Some(PackageSearchResult {
        id,
        version,
        description: entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        authors: normalize_string_list(entry.get("authors"), &[',']),
        total_downloads: entry
            .get("totalDownloads")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        icon_url: entry
            .get("iconUrl")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .unwrap_or(PackageSearchResult::DEFAULT_ICON_URL)
            .to_string(),
        verified: entry.get("verified").and_then(Value::as_bool).unwrap_or(false),
        tags: normalize_string_list(entry.get("tags"), &[',', ' ']),
    })
}

/// Normalize a field that arrives either as a delimited string or as an
/// array. Segments are trimmed, empty segments and non-string array
/// entries are dropped.
pub(crate) fn normalize_string_list(value: Option<&Value>, separators: &[char]) -> Vec<String> {
    match value {
        Some(Value::String(text)) => text
            .split(|c: char| separators.contains(&c))
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Collapse duplicates by case-insensitive id, keeping the entry with the
/// highest version and the first-seen ordering.
fn dedupe_by_id(results: Vec<PackageSearchResult>) -> Vec<PackageSearchResult> {
    let mut best: IndexMap<String, PackageSearchResult> = IndexMap::with_capacity(results.len());
    for result in results {
        match best.entry(result.id.to_lowercase()) {
            Entry::Occupied(mut slot) => {
                if compare_versions(&result.version, &slot.get().version) == Ordering::Greater {
                    slot.insert(result);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(result);
            }
        }
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests;
