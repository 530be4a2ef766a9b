use std::path::PathBuf;

use thiserror::Error;

/// Reasons an archive extraction was aborted
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive has too many entries (limit: {limit})")]
    TooManyEntries { limit: usize },

    #[error("Invalid entry path (potential path traversal): {entry}")]
    PathTraversal { entry: String },

    #[error("Entry path too deep: {entry} (limit: {limit})")]
    PathTooDeep { entry: String, limit: usize },

    #[error("Entry too large: {entry} (limit: {limit} bytes)")]
    SizeLimitExceeded { entry: String, limit: u64 },

    #[error("Total uncompressed size exceeds limit ({limit} bytes)")]
    TotalSizeExceeded { limit: u64 },

    #[error("Entry size mismatch for {entry}: declared {declared}, got {actual}")]
    SizeMismatch {
        entry: String,
        declared: u64,
        actual: u64,
    },

    #[error("Malformed archive: {0}")]
    Corrupt(#[from] zip::result::ZipError),

    #[error("{message} {path}: {source}")]
    Io {
        message: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Errors raised by the safety checks rather than by I/O or decoding
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            ArchiveError::TooManyEntries { .. }
                | ArchiveError::PathTraversal { .. }
                | ArchiveError::PathTooDeep { .. }
                | ArchiveError::SizeLimitExceeded { .. }
                | ArchiveError::TotalSizeExceeded { .. }
                | ArchiveError::SizeMismatch { .. }
        )
    }

    pub(crate) fn io(
        message: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ArchiveError::Io {
            message,
            path,
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to download {url}: HTTP {status}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Download exceeds size limit ({limit} bytes)")]
    DownloadTooLarge { limit: u64 },

    #[error("Failed to extract archive: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Archive did not contain the executable {0}")]
    MissingExecutable(PathBuf),

    #[error("Failed to encode install marker: {0}")]
    Marker(#[from] serde_json::Error),

    #[error("{message} {path}: {source}")]
    Io {
        message: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    pub(crate) fn io(
        message: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| InstallError::Io {
            message,
            path,
            source,
        }
    }
}
