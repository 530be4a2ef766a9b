//! Active version switching
//!
//! The active Terraform is a symlink `<root>/bin/terraform` pointing at
//! `<root>/versions/<version>/terraform`. Putting `<root>/bin` on `PATH` is
//! left to the user.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("Executable not found: {0}")]
    MissingExecutable(PathBuf),

    #[error("Refusing to replace {0}: not a symlink")]
    NotALink(PathBuf),

    #[error("{message} {path}: {source}")]
    Io {
        message: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Points the user's `terraform` at one installed version
#[cfg_attr(test, automock)]
pub trait ActiveVersion: Send + Sync {
    /// Make `executable` the active one, replacing any previous selection.
    fn set_active(&self, executable: &Path) -> Result<(), SwitchError>;

    /// Version name of the active executable, if one is selected.
    fn current(&self) -> Result<Option<String>, SwitchError>;
}

/// [`ActiveVersion`] backed by a filesystem symlink
pub struct SymlinkSwitch {
    link: PathBuf,
    versions_dir: PathBuf,
}

impl SymlinkSwitch {
    pub fn new(link: impl Into<PathBuf>, versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            link: link.into(),
            versions_dir: versions_dir.into(),
        }
    }

    fn remove_existing_link(&self) -> Result<(), SwitchError> {
        let metadata = match fs::symlink_metadata(&self.link) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(SwitchError::Io {
                    message: "Failed to inspect",
                    path: self.link.clone(),
                    source,
                });
            }
        };
        if !metadata.file_type().is_symlink() {
            return Err(SwitchError::NotALink(self.link.clone()));
        }

        fs::remove_file(&self.link).map_err(|source| SwitchError::Io {
            message: "Failed to remove",
            path: self.link.clone(),
            source,
        })
    }
}

impl ActiveVersion for SymlinkSwitch {
    fn set_active(&self, executable: &Path) -> Result<(), SwitchError> {
        if !executable.is_file() {
            return Err(SwitchError::MissingExecutable(executable.to_path_buf()));
        }

        if let Some(parent) = self.link.parent() {
            fs::create_dir_all(parent).map_err(|source| SwitchError::Io {
                message: "Failed to create",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.remove_existing_link()?;
        symlink(executable, &self.link).map_err(|source| SwitchError::Io {
            message: "Failed to link",
            path: self.link.clone(),
            source,
        })?;

        info!("{} -> {}", self.link.display(), executable.display());
        Ok(())
    }

    fn current(&self) -> Result<Option<String>, SwitchError> {
        let target = match fs::read_link(&self.link) {
            Ok(target) => target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SwitchError::Io {
                    message: "Failed to read",
                    path: self.link.clone(),
                    source,
                });
            }
        };

        let version = target
            .strip_prefix(&self.versions_dir)
            .ok()
            .and_then(|relative| relative.components().next())
            .and_then(|component| match component {
                Component::Normal(name) => name.to_str().map(str::to_string),
                _ => None,
            });

        if version.is_none() {
            debug!(
                "Active link points outside the version store: {}",
                target.display()
            );
        }
        Ok(version)
    }
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}
