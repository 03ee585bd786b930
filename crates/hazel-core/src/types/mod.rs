//! Core data types for the Hazel registry client.
//!
//! This module provides the fundamental types used throughout the client:
//! - Package source descriptors and auth configuration
//! - Search and metadata value objects
//! - Version and target-framework comparators

pub mod framework;
pub mod package;
pub mod source;
pub mod version;

// Re-export all public types
pub use framework::{compare_frameworks, FrameworkFamily, FrameworkMoniker};
pub use package::{
    DependencyGroup, Deprecation, DeprecationReason, PackageDependency, PackageIndex,
    PackageSearchResult, PackageVersionDetails, PackageVersionSummary, SearchOptions, Severity,
    Vulnerability,
};
pub use source::{AuthKind, PackageSource, SourceAuth};
pub use version::{compare_versions, Version, VersionError};
