//! Resolution of a symbolic request to one concrete version
//!
//! Selection policies:
//! - `Latest`: newest version in the catalog
//! - `LatestAllowed`: newest version satisfying the constraint
//! - `MinRequired`: oldest version satisfying the constraint
//! - `LatestMatchingPattern`: newest version matching the pattern, restricted
//!   to the constraint when one is supplied

use semver::Version;
use tracing::debug;

use crate::version::catalog::Catalog;
use crate::version::constraint::VersionConstraint;
use crate::version::error::ResolveError;
use crate::version::request::SymbolicRequest;

/// Resolve a request against a catalog.
///
/// # Arguments
/// * `request` - The symbolic request
/// * `constraint` - Declared constraint; mandatory for `LatestAllowed` and `MinRequired`
/// * `catalog` - Candidate versions
///
/// # Returns
/// * `Ok(Version)` - The selected version
/// * `Err(ResolveError::NoVersionsFound)` - The catalog is empty
/// * `Err(ResolveError::ConstraintUnsatisfiable)` - No candidate passes the filters
/// * `Err(ResolveError::ConstraintNotFound)` - A constraint policy was requested without one
pub fn resolve(
    request: &SymbolicRequest,
    constraint: Option<&VersionConstraint>,
    catalog: &Catalog,
) -> Result<Version, ResolveError> {
    let resolved = match request {
        SymbolicRequest::Explicit(version) => return Ok(version.clone()),
        SymbolicRequest::Latest => catalog
            .latest()
            .cloned()
            .ok_or(ResolveError::NoVersionsFound),
        SymbolicRequest::LatestMatchingPattern(pattern) => {
            non_empty(catalog)?;
            catalog
                .versions()
                .iter()
                .filter(|v| constraint.is_none_or(|c| c.matches(v)))
                .filter(|v| pattern.is_match(&v.to_string()))
                .max()
                .cloned()
                .ok_or_else(|| {
                    ResolveError::ConstraintUnsatisfiable(match constraint {
                        Some(c) => format!("pattern '{pattern}' within '{c}'"),
                        None => format!("pattern '{pattern}'"),
                    })
                })
        }
        SymbolicRequest::MinRequired => {
            let constraint = required(constraint)?;
            non_empty(catalog)?;
            satisfying(catalog, constraint)
                .min()
                .cloned()
                .ok_or_else(|| unsatisfiable(constraint))
        }
        SymbolicRequest::LatestAllowed => {
            let constraint = required(constraint)?;
            non_empty(catalog)?;
            satisfying(catalog, constraint)
                .max()
                .cloned()
                .ok_or_else(|| unsatisfiable(constraint))
        }
    }?;

    debug!("Resolved '{}' to {}", request, resolved);
    Ok(resolved)
}

fn satisfying<'a>(
    catalog: &'a Catalog,
    constraint: &'a VersionConstraint,
) -> impl Iterator<Item = &'a Version> {
    catalog.versions().iter().filter(|v| constraint.matches(v))
}

fn required(constraint: Option<&VersionConstraint>) -> Result<&VersionConstraint, ResolveError> {
    constraint.ok_or_else(|| ResolveError::ConstraintNotFound {
        searched: "none supplied".to_string(),
    })
}

fn non_empty(catalog: &Catalog) -> Result<(), ResolveError> {
    if catalog.is_empty() {
        Err(ResolveError::NoVersionsFound)
    } else {
        Ok(())
    }
}

fn unsatisfiable(constraint: &VersionConstraint) -> ResolveError {
    ResolveError::ConstraintUnsatisfiable(format!("'{constraint}'"))
}
