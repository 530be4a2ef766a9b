//! Download and install orchestration

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{Config, INSTALL_MARKER};
use crate::http;
use crate::install::archive::{ArchiveInstaller, InstalledVersion};
use crate::install::download::{archive_url, download_archive};
use crate::install::error::InstallError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallMarker {
    pub version: String,
    pub os: String,
    pub arch: String,
    /// RFC 3339 timestamp
    pub installed_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(InstalledVersion),
    AlreadyInstalled(PathBuf),
}

pub struct Installer {
    config: Config,
    client: reqwest::Client,
    archive: ArchiveInstaller,
}

impl Installer {
    pub fn new(config: Config) -> Result<Self, InstallError> {
        let client = http::client(config.download_timeout)
            .map_err(InstallError::Client)?;
        let archive = ArchiveInstaller::new(config.archive_limits, &config.executable_name());
        Ok(Self {
            config,
            client,
            archive,
        })
    }

    pub fn version_dir(&self, version: &Version) -> PathBuf {
        self.config.versions_dir().join(version.to_string())
    }

    pub fn executable(&self, version: &Version) -> PathBuf {
        self.version_dir(version).join(self.config.executable_name())
    }

    /// A version is installed once its marker exists.
    pub fn is_installed(&self, version: &Version) -> bool {
        self.version_dir(version).join(INSTALL_MARKER).is_file()
    }

    /// Download and extract `version` unless it is already installed.
    pub async fn install(&self, version: &Version) -> Result<InstallOutcome, InstallError> {
        if self.is_installed(version) {
            info!("Terraform v{} is already installed", version);
            return Ok(InstallOutcome::AlreadyInstalled(self.version_dir(version)));
        }

        let url = archive_url(
            &self.config.releases_url,
            version,
            &self.config.os,
            &self.config.arch,
        );
        let archive = download_archive(&self.client, &url, self.config.max_download_bytes).await?;

        let result = self.install_from_archive(version, archive.path());

        let archive_path = archive.path().to_path_buf();
        if let Err(e) = archive.close() {
            warn!(
                "Failed to remove temporary archive {}: {}",
                archive_path.display(),
                e
            );
        }

        let installed = result?;
        info!(
            "Installed Terraform v{} ({} files, {} bytes)",
            version, installed.files, installed.bytes
        );
        Ok(InstallOutcome::Installed(installed))
    }

    /// Extract a local archive into the version store and mark it complete.
    ///
    /// A leftover directory without marker is replaced. On failure the
    /// version directory is removed again.
    pub fn install_from_archive(
        &self,
        version: &Version,
        archive_path: &Path,
    ) -> Result<InstalledVersion, InstallError> {
        let dir = self.version_dir(version);
        if dir.exists() {
            warn!("Removing incomplete installation {}", dir.display());
            fs::remove_dir_all(&dir).map_err(InstallError::io("Failed to remove", &dir))?;
        }

        let versions_dir = self.config.versions_dir();
        fs::create_dir_all(&versions_dir)
            .map_err(InstallError::io("Failed to create", &versions_dir))?;

        let result = self
            .archive
            .extract_file(archive_path, &versions_dir, &version.to_string())
            .map_err(|e| {
                if e.is_security_violation() {
                    error!("Rejected archive for Terraform v{}: {}", version, e);
                }
                InstallError::from(e)
            })
            .and_then(|installed| {
                if !installed.executable.is_file() {
                    return Err(InstallError::MissingExecutable(installed.executable));
                }
                self.write_marker(version, &installed.path)?;
                Ok(installed)
            });

        if result.is_err() {
            rollback(&dir);
        }
        result
    }

    fn write_marker(&self, version: &Version, dir: &Path) -> Result<(), InstallError> {
        let marker = InstallMarker {
            version: version.to_string(),
            os: self.config.os.clone(),
            arch: self.config.arch.clone(),
            installed_at: chrono::Utc::now().to_rfc3339(),
        };
        let path = dir.join(INSTALL_MARKER);
        fs::write(&path, serde_json::to_vec_pretty(&marker)?)
            .map_err(InstallError::io("Failed to write", &path))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Remove an installed version. Returns `false` when it was not present.
    pub fn uninstall(&self, version: &Version) -> Result<bool, InstallError> {
        let dir = self.version_dir(version);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!("Uninstalled Terraform v{}", version);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(InstallError::Io {
                message: "Failed to remove",
                path: dir,
                source,
            }),
        }
    }
}

fn rollback(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => info!("Removed partial installation {}", dir.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove partial installation {}: {}",
            dir.display(),
            e
        ),
    }
}
