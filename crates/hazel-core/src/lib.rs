//! # hazel-core
//!
//! Core types shared across the Hazel registry client crates.
//!
//! This crate provides:
//! - PackageSource and auth descriptors for configured feeds
//! - Search and metadata value objects returned by the client
//! - Version and target-framework comparators
//! - HazelError enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (PackageSource, PackageSearchResult, etc.)
//! - `error`: Error types and result aliases

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{HazelError, HazelResult};
pub use types::{
    compare_frameworks, compare_versions, AuthKind, DependencyGroup, Deprecation,
    DeprecationReason, FrameworkFamily, FrameworkMoniker, PackageDependency, PackageIndex,
    PackageSearchResult, PackageSource, PackageVersionDetails, PackageVersionSummary,
    SearchOptions, Severity, SourceAuth, Version, VersionError, Vulnerability,
};
