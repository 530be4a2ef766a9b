//! Ordered sets of available versions, from the local store or the remote index

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use tracing::debug;

use crate::config::INSTALL_MARKER;
use crate::version::error::CatalogError;
use crate::version::index::ReleaseIndex;
use crate::version::semver::parse_version;

/// Where catalog versions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// Versions present in the local version store
    Local,
    /// Versions advertised by the release index
    Remote,
}

/// Versions sorted in descending order without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    versions: Vec<Version>,
}

impl Catalog {
    pub fn from_versions(mut versions: Vec<Version>) -> Self {
        versions.sort_unstable_by(|a, b| b.cmp(a));
        versions.dedup();
        Self { versions }
    }

    /// Build a catalog from raw names, silently skipping anything that is not
    /// a release name under the chosen pattern.
    pub fn from_names<I, S>(names: I, include_prerelease: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_versions(
            names
                .into_iter()
                .filter_map(|name| parse_version(name.as_ref(), include_prerelease))
                .collect(),
        )
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Keep only versions matching the predicate, preserving order.
    pub fn filter<F>(&self, predicate: F) -> Catalog
    where
        F: Fn(&Version) -> bool,
    {
        Catalog {
            versions: self
                .versions
                .iter()
                .filter(|v| predicate(*v))
                .cloned()
                .collect(),
        }
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.versions.iter().map(Version::to_string).collect()
    }
}

/// Lists versions from either source
pub struct VersionCatalog {
    versions_dir: PathBuf,
    index: Arc<dyn ReleaseIndex>,
}

impl VersionCatalog {
    pub fn new(versions_dir: impl Into<PathBuf>, index: Arc<dyn ReleaseIndex>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
            index,
        }
    }

    /// List available versions, newest first.
    ///
    /// # Returns
    /// * `Ok(Catalog)` - possibly empty; emptiness is for the caller to judge
    /// * `Err(CatalogError)` - the source could not be enumerated at all
    pub async fn list_versions(
        &self,
        source: VersionSource,
        include_prerelease: bool,
    ) -> Result<Catalog, CatalogError> {
        let catalog = match source {
            VersionSource::Local => list_local_versions(&self.versions_dir, include_prerelease)?,
            VersionSource::Remote => {
                let names = self.index.fetch_release_names().await?;
                Catalog::from_names(names, include_prerelease)
            }
        };
        debug!("{:?} catalog has {} versions", source, catalog.len());
        Ok(catalog)
    }
}

/// List versions installed in the version store.
///
/// Only directories holding the install marker count; leftovers of an
/// interrupted install are skipped. A store that does not exist yet simply
/// has nothing installed.
pub fn list_local_versions(
    versions_dir: &Path,
    include_prerelease: bool,
) -> Result<Catalog, CatalogError> {
    let read_dir_error = |source: io::Error| CatalogError::ReadDir {
        path: versions_dir.to_path_buf(),
        source,
    };

    let entries = match std::fs::read_dir(versions_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Catalog::default()),
        Err(e) => return Err(read_dir_error(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if !path.join(INSTALL_MARKER).is_file() {
            debug!("Skipping incomplete installation {}", path.display());
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    Ok(Catalog::from_names(names, include_prerelease))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::index::MockReleaseIndex;
    use rstest::rstest;
    use tempfile::TempDir;

    fn names(catalog: &Catalog) -> Vec<String> {
        catalog.to_strings()
    }

    fn install_marked(versions_dir: &Path, name: &str) {
        let dir = versions_dir.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(INSTALL_MARKER), b"{}").unwrap();
    }

    #[rstest]
    #[case(vec!["1.0.0", "2.0.0", "1.5.0"], false, vec!["2.0.0", "1.5.0", "1.0.0"])]
    #[case(vec!["v1.0.0", "1.0.0", "1.0.0"], false, vec!["1.0.0"])]
    #[case(vec!["1.6.0-rc1", "1.5.0", "1.6.0"], false, vec!["1.6.0", "1.5.0"])]
    #[case(vec!["1.6.0-rc1", "1.5.0", "1.6.0"], true, vec!["1.6.0", "1.6.0-rc1", "1.5.0"])]
    #[case(vec!["invalid", "1.2", "../1.0.0", "1.0.0"], true, vec!["1.0.0"])]
    #[case(vec![], true, vec![])]
    fn from_names_filters_sorts_and_dedups(
        #[case] input: Vec<&str>,
        #[case] include_prerelease: bool,
        #[case] expected: Vec<&str>,
    ) {
        let catalog = Catalog::from_names(input, include_prerelease);
        assert_eq!(names(&catalog), expected);
    }

    #[test]
    fn filter_is_idempotent() {
        let catalog = Catalog::from_names(["0.9.0", "1.0.0", "1.2.3", "2.0.0"], false);
        let predicate = |v: &Version| v.major == 1;

        let once = catalog.filter(predicate);
        let twice = once.filter(predicate);

        assert_eq!(once, twice);
        assert_eq!(names(&once), vec!["1.2.3", "1.0.0"]);
    }

    #[test]
    fn catalog_strings_parse_back_to_equal_versions() {
        let catalog = Catalog::from_names(["v1.2.3", "1.6.0-beta2"], true);
        let reparsed = Catalog::from_names(catalog.to_strings(), true);
        assert_eq!(reparsed, catalog);
    }

    #[test]
    fn list_local_versions_reads_version_directories() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["1.4.2", "1.5.0", "1.6.0-rc1", "not-a-version"] {
            install_marked(temp_dir.path(), name);
        }
        // Plain files are never installs
        std::fs::write(temp_dir.path().join("1.9.0"), b"").unwrap();

        let stable = list_local_versions(temp_dir.path(), false).unwrap();
        let all = list_local_versions(temp_dir.path(), true).unwrap();

        assert_eq!(names(&stable), vec!["1.5.0", "1.4.2"]);
        assert_eq!(names(&all), vec!["1.6.0-rc1", "1.5.0", "1.4.2"]);
    }

    #[test]
    fn list_local_versions_skips_directories_without_marker() {
        let temp_dir = TempDir::new().unwrap();
        install_marked(temp_dir.path(), "1.5.0");
        std::fs::create_dir(temp_dir.path().join("1.9.0")).unwrap();
        std::fs::write(temp_dir.path().join("1.9.0/terraform"), b"partial").unwrap();

        let catalog = list_local_versions(temp_dir.path(), false).unwrap();

        assert_eq!(names(&catalog), vec!["1.5.0"]);
    }

    #[test]
    fn list_local_versions_treats_missing_store_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = list_local_versions(&temp_dir.path().join("versions"), false).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn list_local_versions_reports_unreadable_store() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("versions");
        std::fs::write(&file, b"not a directory").unwrap();

        assert!(matches!(
            list_local_versions(&file, false),
            Err(CatalogError::ReadDir { .. })
        ));
    }

    #[tokio::test]
    async fn list_versions_remote_uses_index_names() {
        let mut index = MockReleaseIndex::new();
        index.expect_fetch_release_names().times(1).returning(|| {
            Ok(vec![
                "1.4.2".to_string(),
                "1.6.0-alpha20230802".to_string(),
                "1.5.0".to_string(),
            ])
        });

        let temp_dir = TempDir::new().unwrap();
        let catalog = VersionCatalog::new(temp_dir.path(), Arc::new(index));
        let result = catalog
            .list_versions(VersionSource::Remote, false)
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["1.5.0", "1.4.2"]);
    }

    #[tokio::test]
    async fn list_versions_local_does_not_touch_index() {
        let mut index = MockReleaseIndex::new();
        index.expect_fetch_release_names().never();

        let temp_dir = TempDir::new().unwrap();
        install_marked(temp_dir.path(), "1.5.0");

        let catalog = VersionCatalog::new(temp_dir.path(), Arc::new(index));
        let result = catalog
            .list_versions(VersionSource::Local, false)
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["1.5.0"]);
    }
}
