//! Command-level flows
//!
//! Every command is "build a request, resolve it against one catalog, act on
//! the result". The flows here only differ in which catalog they consult and
//! what they do with the resolved version.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use semver::Version;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::install::installer::{InstallOutcome, Installer};
use crate::switch::{ActiveVersion, SymlinkSwitch};
use crate::version::catalog::{Catalog, VersionCatalog, VersionSource};
use crate::version::constraint::VersionConstraint;
use crate::version::declaration::{
    discover_constraint, find_required_version, read_pin_file, write_pin_file,
};
use crate::version::error::ResolveError;
use crate::version::index::{HttpReleaseIndex, ReleaseIndex};
use crate::version::request::{LATEST, SymbolicRequest};
use crate::version::resolver::resolve;

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledEntry {
    pub version: Version,
    pub active: bool,
}

pub struct Toolchain {
    config: Config,
    working_dir: PathBuf,
    catalog: VersionCatalog,
    installer: Installer,
    switch: Box<dyn ActiveVersion>,
}

impl Toolchain {
    /// Toolchain backed by the HTTP release index and a symlink switch.
    pub fn new(config: Config, working_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let index = HttpReleaseIndex::new(&config.releases_url, config.index_timeout)
            .context("Failed to create release index client")?;
        let switch = SymlinkSwitch::new(config.active_link(), config.versions_dir());
        Self::with_parts(config, working_dir, Arc::new(index), Box::new(switch))
    }

    pub fn with_parts(
        config: Config,
        working_dir: impl Into<PathBuf>,
        index: Arc<dyn ReleaseIndex>,
        switch: Box<dyn ActiveVersion>,
    ) -> anyhow::Result<Self> {
        let catalog = VersionCatalog::new(config.versions_dir(), index);
        let installer = Installer::new(config.clone())?;
        Ok(Self {
            config,
            working_dir: working_dir.into(),
            catalog,
            installer,
            switch,
        })
    }

    /// Build a request from the command line, falling back to
    /// `TFVM_TERRAFORM_VERSION`, then the pin file, then `latest`.
    pub fn request(
        &self,
        version: Option<&str>,
        pattern: Option<&str>,
    ) -> Result<SymbolicRequest, ResolveError> {
        if let Some(version) = version {
            return SymbolicRequest::parse(version, pattern);
        }
        if pattern.is_some() {
            return SymbolicRequest::parse(LATEST, pattern);
        }

        if let Some(requested) = &self.config.requested_version {
            debug!("Using version request '{}' from the environment", requested);
            return SymbolicRequest::parse(requested, None);
        }
        if let Some(pinned) = read_pin_file(&self.working_dir)? {
            debug!("Using version request '{}' from the pin file", pinned);
            return SymbolicRequest::parse(&pinned, None);
        }
        Ok(SymbolicRequest::Latest)
    }

    /// Resolve a request against the local or remote catalog.
    ///
    /// Explicit versions never touch a catalog. The declared constraint is
    /// looked up before the catalog is listed, so a missing declaration fails
    /// without any network traffic.
    pub async fn resolve(
        &self,
        request: &SymbolicRequest,
        source: VersionSource,
        include_prerelease: bool,
    ) -> Result<Version, ResolveError> {
        if let SymbolicRequest::Explicit(version) = request {
            return Ok(version.clone());
        }

        let constraint = match request {
            request if request.needs_constraint() => Some(discover_constraint(&self.working_dir)?),
            SymbolicRequest::LatestMatchingPattern(_) => {
                find_required_version(&self.working_dir)?
                    .map(|expression| VersionConstraint::parse(&expression))
                    .transpose()?
            }
            _ => None,
        };

        let catalog = self.catalog.list_versions(source, include_prerelease).await?;
        resolve(request, constraint.as_ref(), &catalog)
    }

    pub async fn install(
        &self,
        request: &SymbolicRequest,
        include_prerelease: bool,
    ) -> anyhow::Result<(Version, InstallOutcome)> {
        let version = self
            .resolve(request, VersionSource::Remote, include_prerelease)
            .await?;
        let outcome = self
            .installer
            .install(&version)
            .await
            .with_context(|| format!("Failed to install Terraform v{version}"))?;
        Ok((version, outcome))
    }

    /// Install if needed, then make the version active.
    pub async fn use_version(
        &self,
        request: &SymbolicRequest,
        include_prerelease: bool,
    ) -> anyhow::Result<Version> {
        let (version, _) = self.install(request, include_prerelease).await?;
        self.switch
            .set_active(&self.installer.executable(&version))
            .with_context(|| format!("Failed to switch to Terraform v{version}"))?;
        info!("Switched to Terraform v{}", version);
        Ok(version)
    }

    /// Remove an installed version. Returns `None` when it was not installed.
    pub async fn uninstall(
        &self,
        request: &SymbolicRequest,
        include_prerelease: bool,
    ) -> anyhow::Result<Option<Version>> {
        if request.needs_constraint() {
            return Err(ResolveError::InvalidArgument(format!(
                "'{request}' cannot be used with uninstall, give a version or {LATEST}"
            ))
            .into());
        }

        let version = self
            .resolve(request, VersionSource::Local, include_prerelease)
            .await?;

        if self.current_version()?.as_deref() == Some(version.to_string().as_str()) {
            warn!(
                "Terraform v{} is the active version; {} will dangle",
                version,
                self.config.active_link().display()
            );
        }

        let removed = self.installer.uninstall(&version)?;
        Ok(removed.then_some(version))
    }

    pub async fn list_installed(
        &self,
        include_prerelease: bool,
    ) -> anyhow::Result<Vec<InstalledEntry>> {
        let catalog = self
            .catalog
            .list_versions(VersionSource::Local, include_prerelease)
            .await?;
        let current = self.current_version()?;

        Ok(catalog
            .versions()
            .iter()
            .map(|version| InstalledEntry {
                active: current.as_deref() == Some(version.to_string().as_str()),
                version: version.clone(),
            })
            .collect())
    }

    pub async fn list_remote(&self, include_prerelease: bool) -> anyhow::Result<Catalog> {
        Ok(self
            .catalog
            .list_versions(VersionSource::Remote, include_prerelease)
            .await?)
    }

    /// Name of the active version, if any.
    pub fn current_version(&self) -> anyhow::Result<Option<String>> {
        Ok(self.switch.current()?)
    }

    /// Write the active version into the working directory's pin file.
    pub fn pin(&self) -> anyhow::Result<(Version, PathBuf)> {
        let Some(current) = self.current_version()? else {
            bail!("No active Terraform version to pin");
        };
        let version = Version::parse(&current)
            .with_context(|| format!("Active version '{current}' is not a valid version"))?;
        let path = write_pin_file(&self.working_dir, &version).with_context(|| {
            format!("Failed to write pin file in {}", self.working_dir.display())
        })?;
        Ok((version, path))
    }
}
