//! README retrieval over the flat-container convention.
//!
//! Readme content is served from the feed's flat container at
//! `<base>/<id>/<version>/readme`. Feeds without flat-content support
//! cannot serve readmes at all, which is a domain-level absence rather
//! than a failure. Oversized content is truncated, not rejected.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use hazel_core::error::{HazelError, HazelResult};
use hazel_core::types::PackageSource;

use crate::index::ServiceIndexResolver;
use crate::metadata::upgrade_not_found;
use crate::providers::scoped_headers;
use crate::transport::{HttpPipeline, RequestOptions};

/// Readme content is capped at 500 KiB
pub const README_MAX_BYTES: usize = 500 * 1024;

/// Appended in place of content beyond the cap
pub const TRUNCATION_MARKER: &str = "\n\n[README truncated]";

/// Fetches package readmes from the flat container
pub struct ReadmeFetcher {
    http: HttpPipeline,
    resolver: Arc<ServiceIndexResolver>,
}

impl ReadmeFetcher {
    pub fn new(http: HttpPipeline, resolver: Arc<ServiceIndexResolver>) -> Self {
        Self { http, resolver }
    }

    /// Fetch the readme for one package version as text
    pub async fn readme(
        &self,
        source: &PackageSource,
        id: &str,
        version: &str,
        cancel: Option<CancellationToken>,
    ) -> HazelResult<String> {
        let base = self
            .resolver
            .flat_container_base(source, &self.http, cancel.clone())
            .await?;
        let Some(base) = base else {
            // No flat container, no readme; don't attempt a request
            return Err(HazelError::not_found(format!(
                "readme for '{id}' {version} (feed has no flat-content support)"
            )));
        };

        let url = format!(
            "{}/{}/{}/readme",
            base.trim_end_matches('/'),
            id.to_lowercase(),
            version.to_lowercase()
        );
        let request = RequestOptions::new(scoped_headers(source, &url), cancel);
        let content = self
            .http
            .get_text(&url, &request)
            .await
            .map_err(|error| upgrade_not_found(error, format!("readme for '{id}' {version}")))?;

        if content.len() > README_MAX_BYTES {
            debug!(package = id, bytes = content.len(), "truncating oversized readme");
        }
        Ok(truncate(content))
    }
}

/// Cap content at the byte limit, cutting on a char boundary, and mark
/// the truncation.
fn truncate(content: String) -> String {
    if content.len() <= README_MAX_BYTES {
        return content;
    }
    let mut cut = README_MAX_BYTES;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = content[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
