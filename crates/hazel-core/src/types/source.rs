//! Package source descriptors.
//!
//! A `PackageSource` describes one configured feed: where its service index
//! lives, which provider quirks apply, and how requests authenticate. The
//! values are produced by the host's configuration layer and are immutable
//! for the duration of a resolution session.

use serde::{Deserialize, Serialize};

/// A configured package feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageSource {
    /// Stable identifier used to select this source explicitly
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Provider tag selecting a resolution strategy (unset means spec-compliant)
    pub provider: Option<String>,
    /// URL of the feed's service index document
    pub index_url: String,
    /// Disabled sources are skipped by every operation
    pub enabled: bool,
    /// Credentials attached to requests against this source
    pub auth: Option<SourceAuth>,
}

/// How a source authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthKind {
    None,
    Basic,
    Bearer,
    ApiKey,
}

/// Credentials for a package source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceAuth {
    pub kind: AuthKind,
    /// Username for basic auth
    pub username: Option<String>,
    /// Password, bearer token, or API key depending on `kind`
    pub secret: Option<String>,
    /// Custom header name for api-key auth
    pub header: Option<String>,
}

impl PackageSource {
    /// Create an enabled source with no auth and no provider tag
    pub fn new(id: impl Into<String>, name: impl Into<String>, index_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: None,
            index_url: index_url.into(),
            enabled: true,
            auth: None,
        }
    }

    /// Set the provider tag
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attach credentials
    pub fn with_auth(mut self, auth: SourceAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Mark the source disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl SourceAuth {
    /// Basic auth from a username/password pair
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Basic,
            username: Some(username.into()),
            secret: Some(password.into()),
            header: None,
        }
    }

    /// Bearer-token auth
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Bearer,
            username: None,
            secret: Some(token.into()),
            header: None,
        }
    }

    /// Api-key auth under the default or a custom header
    pub fn api_key(key: impl Into<String>, header: Option<String>) -> Self {
        Self {
            kind: AuthKind::ApiKey,
            username: None,
            secret: Some(key.into()),
            header,
        }
    }
}
