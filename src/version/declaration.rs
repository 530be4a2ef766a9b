//! Project-level version declarations
//!
//! - `required_version = "<expr>"` in `*.tf` files of the working directory
//! - `.terraform-version` pin file holding a single version

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::version::constraint::VersionConstraint;
use crate::version::error::ResolveError;

/// Name of the pin file in the working directory
pub const PIN_FILE: &str = ".terraform-version";

/// Extension of files scanned for `required_version`
pub const DECLARATION_EXTENSION: &str = "tf";

static REQUIRED_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*required_version\s*=\s*"([^"]+)""#).expect("required_version pattern")
});

/// Find the first `required_version` expression across declaration files.
///
/// Files are visited in lexicographic order so the result is stable between
/// runs; within a file the first matching line wins.
pub fn find_required_version(dir: &Path) -> Result<Option<String>, ResolveError> {
    for path in declaration_files(dir)? {
        let content = fs::read_to_string(&path).map_err(|source| ResolveError::Io {
            path: path.clone(),
            source,
        })?;

        if let Some(expression) = content
            .lines()
            .find_map(|line| REQUIRED_VERSION.captures(line).map(|caps| caps[1].to_string()))
        {
            debug!("Found required_version '{}' in {}", expression, path.display());
            return Ok(Some(expression));
        }
    }
    Ok(None)
}

/// Find and compile the declared constraint, failing when none is declared.
pub fn discover_constraint(dir: &Path) -> Result<VersionConstraint, ResolveError> {
    match find_required_version(dir)? {
        Some(expression) => VersionConstraint::parse(&expression),
        None => Err(ResolveError::ConstraintNotFound {
            searched: format!("*.{} files in {}", DECLARATION_EXTENSION, dir.display()),
        }),
    }
}

fn declaration_files(dir: &Path) -> Result<Vec<PathBuf>, ResolveError> {
    let io_error = |source: io::Error| ResolveError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == DECLARATION_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read the version request from the pin file, if present.
///
/// The first non-empty line is used, with an optional leading `v` removed.
pub fn read_pin_file(dir: &Path) -> Result<Option<String>, ResolveError> {
    let path = dir.join(PIN_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ResolveError::Io { path, source }),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix('v').unwrap_or(line).to_string()))
}

/// Write a version to the pin file, replacing any previous pin.
pub fn write_pin_file(dir: &Path, version: &Version) -> io::Result<PathBuf> {
    let path = dir.join(PIN_FILE);
    fs::write(&path, format!("{version}\n"))?;
    Ok(path)
}
