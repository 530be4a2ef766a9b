use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

static STABLE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?\d+\.\d+\.\d+$").expect("stable version pattern"));

static PRERELEASE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?\d+\.\d+\.\d+(-[a-z]+\d+)?$").expect("prerelease version pattern")
});

/// Pattern a release name must match to be considered a version.
///
/// Stable names are `1.5.0` or `v1.5.0`; with prereleases included,
/// `1.6.0-rc1` and `1.6.0-alpha20230802` are accepted too.
pub fn version_pattern(include_prerelease: bool) -> &'static Regex {
    if include_prerelease {
        &PRERELEASE_VERSION
    } else {
        &STABLE_VERSION
    }
}

/// Parse a release name into a Version, ignoring an optional leading `v`.
///
/// Names that do not match [`version_pattern`] are not versions and yield `None`.
pub fn parse_version(name: &str, include_prerelease: bool) -> Option<Version> {
    if !version_pattern(include_prerelease).is_match(name) {
        return None;
    }
    Version::parse(name.strip_prefix('v').unwrap_or(name)).ok()
}

/// Parse a constraint operand, normalizing partial versions.
///
/// Returns the version together with the number of segments that were
/// actually written, which the pessimistic operator needs.
///
/// Examples:
/// - "1" -> (Version(1, 0, 0), 1)
/// - "1.2" -> (Version(1, 2, 0), 2)
/// - "v1.2.3" -> (Version(1, 2, 3), 3)
pub fn parse_partial_version(version: &str) -> Option<(Version, usize)> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized)
        .ok()
        .map(|parsed| (parsed, parts.len().min(3)))
}
