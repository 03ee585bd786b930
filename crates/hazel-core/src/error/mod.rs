//! Error types and result aliases for Hazel operations.
//!
//! Provides a unified error type covering the whole request path with
//! actionable error messages. Every layer forwards these values unchanged
//! unless it has a more specific classification to apply (fetchers upgrade
//! a generic 404 into `NotFound`, auth-aware strategies rewrite 401s).

use thiserror::Error;

/// Unified error type for all Hazel registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HazelError {
    // Transport errors
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    // Protocol errors
    #[error("Registry request failed{}: {message}", fmt_status(.status))]
    Api { status: Option<u16>, message: String },

    #[error("Authentication required: {hint}")]
    AuthRequired { hint: String },

    #[error("Rate limited by registry{}", fmt_retry_after(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("Failed to parse response: {message}")]
    Parse { message: String },

    // Domain errors
    #[error("{resource} not found")]
    NotFound { resource: String },
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

fn fmt_retry_after(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {secs} s"),
        None => String::new(),
    }
}

/// Result type alias for Hazel operations
pub type HazelResult<T> = Result<T, HazelError>;

impl HazelError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an API error for an HTTP status
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an API error with no associated HTTP status
    pub fn api_contract(message: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a domain-level not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::AuthRequired { .. } => Some(401),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Check if a retry may succeed (connection failures and server errors)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|code| code >= 500),
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Network { .. } => Some("Check your internet connection and try again"),
            Self::AuthRequired { .. } => {
                Some("Verify the credentials configured for this package source")
            }
            Self::RateLimited { .. } => {
                Some("The feed is throttling requests; wait before retrying")
            }
            Self::NotFound { .. } => {
                Some("Check the package id spelling or try another source")
            }
            _ => None,
        }
    }
}
