use std::path::PathBuf;

use thiserror::Error;

/// Failure to enumerate a catalog source. Every variant means the catalog is
/// unavailable, which callers must not confuse with "no versions matched".
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Release index exceeds {limit} bytes")]
    IndexTooLarge { limit: u64 },

    #[error("Failed to read version store {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid version constraint '{expression}': {reason}")]
    InvalidConstraint { expression: String, reason: String },

    #[error("Invalid version pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("No required_version constraint found ({searched})")]
    ConstraintNotFound { searched: String },

    #[error("No available version satisfies {0}")]
    ConstraintUnsatisfiable(String),

    #[error("No versions found")]
    NoVersionsFound,

    #[error("Version catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
