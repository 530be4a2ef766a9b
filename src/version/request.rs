//! Symbolic version requests ("latest", "min-required", ...)

use std::fmt;

use regex::Regex;
use semver::Version;

use crate::version::error::ResolveError;
use crate::version::semver::parse_version;

pub const LATEST: &str = "latest";
pub const LATEST_ALLOWED: &str = "latest-allowed";
pub const MIN_REQUIRED: &str = "min-required";

/// What the user asked for, before it is resolved to a concrete version
#[derive(Debug, Clone)]
pub enum SymbolicRequest {
    /// A concrete version, used as-is
    Explicit(Version),
    /// Newest version in the catalog
    Latest,
    /// Newest version satisfying the declared constraint
    LatestAllowed,
    /// Oldest version satisfying the declared constraint
    MinRequired,
    /// Newest version whose name matches the pattern
    LatestMatchingPattern(Regex),
}

impl SymbolicRequest {
    /// Parse a request string with an optional pattern argument.
    ///
    /// A pattern is only meaningful after `latest` (`latest ^1\.5`).
    pub fn parse(request: &str, pattern: Option<&str>) -> Result<Self, ResolveError> {
        let request = request.trim();

        if let Some(pattern) = pattern {
            if request != LATEST {
                return Err(ResolveError::InvalidArgument(format!(
                    "a version pattern can only follow '{LATEST}', got '{request}'"
                )));
            }
            return Ok(SymbolicRequest::LatestMatchingPattern(Regex::new(pattern)?));
        }

        match request {
            LATEST => Ok(SymbolicRequest::Latest),
            LATEST_ALLOWED => Ok(SymbolicRequest::LatestAllowed),
            MIN_REQUIRED => Ok(SymbolicRequest::MinRequired),
            other => parse_version(other, true)
                .map(SymbolicRequest::Explicit)
                .ok_or_else(|| {
                    ResolveError::InvalidArgument(format!(
                        "'{other}' is not a version or one of {LATEST}, {LATEST_ALLOWED}, {MIN_REQUIRED}"
                    ))
                }),
        }
    }

    /// Whether resolving this request requires a declared constraint
    pub fn needs_constraint(&self) -> bool {
        matches!(
            self,
            SymbolicRequest::LatestAllowed | SymbolicRequest::MinRequired
        )
    }
}

impl fmt::Display for SymbolicRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicRequest::Explicit(v) => write!(f, "{v}"),
            SymbolicRequest::Latest => f.write_str(LATEST),
            SymbolicRequest::LatestAllowed => f.write_str(LATEST_ALLOWED),
            SymbolicRequest::MinRequired => f.write_str(MIN_REQUIRED),
            SymbolicRequest::LatestMatchingPattern(re) => write!(f, "{LATEST} {re}"),
        }
    }
}
