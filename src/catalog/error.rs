//! Catalog error types.

use thiserror::Error;

use super::metric::namespace_to_string;

/// Errors returned by catalog lookups and subscription changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Nothing is registered at (or below, for fetches) the namespace.
    #[error("metric not found: {namespace}")]
    MetricNotFound { namespace: String },

    /// The namespace exists but no entry carries the requested version.
    #[error("metric not found: {namespace} (version {version})")]
    VersionNotFound { namespace: String, version: i32 },

    /// Unsubscribe was called on an entry with no subscribers.
    #[error("subscription count cannot be negative: {key}")]
    NegativeSubscriptionCount { key: String },
}

impl CatalogError {
    pub(crate) fn metric_not_found<S: AsRef<str>>(namespace: &[S]) -> Self {
        Self::MetricNotFound {
            namespace: namespace_to_string(namespace),
        }
    }

    pub(crate) fn version_not_found<S: AsRef<str>>(namespace: &[S], version: i32) -> Self {
        Self::VersionNotFound {
            namespace: namespace_to_string(namespace),
            version,
        }
    }

    /// True for both namespace and version misses.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MetricNotFound { .. } | Self::VersionNotFound { .. }
        )
    }
}
