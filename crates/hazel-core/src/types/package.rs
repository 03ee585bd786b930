//! Search and metadata value objects.
//!
//! Normalized shapes handed to the host after the registry wire formats
//! have been parsed. These are plain values; nothing here is cached beyond
//! the call that produced it.

use serde::{Deserialize, Serialize};

/// Options for a package search
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchOptions {
    /// Query text (defaults to an empty query matching everything)
    pub query: Option<String>,
    /// Include prerelease versions (default false)
    pub prerelease: Option<bool>,
    /// Number of results to skip (default 0)
    pub skip: Option<u32>,
    /// Number of results to return (default 20)
    pub take: Option<u32>,
    /// SemVer compatibility level sent to the feed (default "2.0.0")
    pub sem_ver_level: Option<String>,
}

impl SearchOptions {
    pub const DEFAULT_TAKE: u32 = 20;
    pub const DEFAULT_SEM_VER_LEVEL: &'static str = "2.0.0";

    /// Search options with just a query string
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            query: Some(text.into()),
            ..Self::default()
        }
    }
}

/// One normalized entry from a search response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageSearchResult {
    pub id: String,
    pub version: String,
    pub description: String,
    pub authors: Vec<String>,
    pub total_downloads: u64,
    pub icon_url: String,
    pub verified: bool,
    pub tags: Vec<String>,
}

impl PackageSearchResult {
    /// Placeholder icon for packages that do not ship one
    pub const DEFAULT_ICON_URL: &'static str =
        "https://www.nuget.org/Content/gallery/img/default-package-icon.svg";
}

/// All known versions of a package
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageIndex {
    pub id: String,
    /// Sorted descending by version precedence
    pub versions: Vec<PackageVersionSummary>,
    pub count: usize,
}

/// One version entry from a registration index
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageVersionSummary {
    pub version: String,
    pub downloads: Option<u64>,
    pub registration_url: String,
    pub content_url: String,
    pub listed: bool,
}

/// Full metadata for a single package version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageVersionDetails {
    pub id: String,
    pub version: String,
    pub description: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub license_expression: Option<String>,
    pub license_url: Option<String>,
    pub icon_url: Option<String>,
    pub project_url: Option<String>,
    pub readme_url: Option<String>,
    pub content_url: Option<String>,
    pub listed: bool,
    /// Sorted by framework precedence, the "any framework" group last
    pub dependency_groups: Vec<DependencyGroup>,
    pub deprecation: Option<Deprecation>,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Dependencies that apply to one target framework
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DependencyGroup {
    /// Target-framework moniker; empty means "any framework"
    pub target_framework: String,
    pub dependencies: Vec<PackageDependency>,
}

/// A single dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageDependency {
    pub id: String,
    /// Version range string as reported by the feed
    pub range: String,
}

/// Deprecation state of a package version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Deprecation {
    pub reasons: Vec<DeprecationReason>,
    pub message: Option<String>,
    /// Replacement suggested by the package owner
    pub alternate: Option<PackageDependency>,
}

/// Restricted deprecation reason set; unrecognized wire values are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum DeprecationReason {
    Legacy,
    CriticalBugs,
    Other,
}

impl DeprecationReason {
    /// Decode a wire reason string, `None` for unrecognized values
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "Legacy" => Some(Self::Legacy),
            "CriticalBugs" => Some(Self::CriticalBugs),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A known vulnerability affecting a package version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Vulnerability {
    pub advisory_url: String,
    pub severity: Severity,
}

/// Vulnerability severity decoded from the feed's 0-3 numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Decode a numeric severity code; unknown codes default to Low
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Moderate,
            2 => Self::High,
            3 => Self::Critical,
            _ => Self::Low,
        }
    }
}
