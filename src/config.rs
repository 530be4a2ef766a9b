use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::install::archive::ArchiveLimits;

/// Product name used in release URLs and as the executable name
pub const PRODUCT: &str = "terraform";

/// Release index and archive base URL
pub const DEFAULT_RELEASES_URL: &str = "https://releases.hashicorp.com/terraform";

// =============================================================================
// Time and size limits
// =============================================================================

/// Timeout for the release index request in seconds
pub const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 15;

/// Timeout for an archive download in seconds (whole transfer)
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Largest archive accepted from the network (500 MiB)
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 500 * 1024 * 1024;

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_ROOT: &str = "TFVM_ROOT";
pub const ENV_OS: &str = "TFVM_OS";
pub const ENV_ARCH: &str = "TFVM_ARCH";
pub const ENV_TERRAFORM_VERSION: &str = "TFVM_TERRAFORM_VERSION";
pub const ENV_RELEASES_URL: &str = "TFVM_RELEASES_URL";

/// Optional settings file inside the root directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Written into a version directory once its installation has completed
pub const INSTALL_MARKER: &str = ".tfvm-install.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of `config.json`; every field is optional
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    pub releases_url: String,
    pub index_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub max_download_bytes: u64,
    pub archive_limits: ArchiveLimits,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            index_timeout_secs: DEFAULT_INDEX_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            archive_limits: ArchiveLimits::default(),
        }
    }
}

impl FileConfig {
    /// Load the settings file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root_dir: PathBuf,
    pub os: String,
    pub arch: String,
    pub releases_url: String,
    pub index_timeout: Duration,
    pub download_timeout: Duration,
    pub max_download_bytes: u64,
    pub archive_limits: ArchiveLimits,
    /// Version request taken from the environment, if any
    pub requested_version: Option<String>,
}

impl Config {
    /// Defaults for the host platform rooted at `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_file(root_dir.into(), FileConfig::default())
    }

    fn with_file(root_dir: PathBuf, file: FileConfig) -> Self {
        Self {
            root_dir,
            os: host_os().to_string(),
            arch: host_arch().to_string(),
            releases_url: file.releases_url,
            index_timeout: Duration::from_secs(file.index_timeout_secs),
            download_timeout: Duration::from_secs(file.download_timeout_secs),
            max_download_bytes: file.max_download_bytes,
            archive_limits: file.archive_limits,
            requested_version: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Build the configuration from an environment lookup.
    ///
    /// Empty values count as unset. Environment values take precedence over
    /// `config.json`, which takes precedence over the defaults.
    pub fn from_lookup<F>(lookup: F, home_dir: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let root_dir = root_dir_with_env(lookup(ENV_ROOT), home_dir);
        let file = FileConfig::load(&root_dir.join(CONFIG_FILE_NAME))?;
        let mut config = Self::with_file(root_dir, file);

        if let Some(os) = lookup(ENV_OS) {
            config.os = os;
        }
        if let Some(arch) = lookup(ENV_ARCH) {
            config.arch = arch;
        }
        if let Some(url) = lookup(ENV_RELEASES_URL) {
            config.releases_url = url;
        }
        config.requested_version = lookup(ENV_TERRAFORM_VERSION).map(|v| v.trim().to_string());

        Ok(config)
    }

    /// Directory holding one subdirectory per installed version
    pub fn versions_dir(&self) -> PathBuf {
        self.root_dir.join("versions")
    }

    /// Directory holding the active-version link
    pub fn bin_dir(&self) -> PathBuf {
        self.root_dir.join("bin")
    }

    pub fn active_link(&self) -> PathBuf {
        self.bin_dir().join(self.executable_name())
    }

    /// Name of the executable inside a release archive
    pub fn executable_name(&self) -> String {
        if self.os == "windows" {
            format!("{PRODUCT}.exe")
        } else {
            PRODUCT.to_string()
        }
    }
}

fn root_dir_with_env(root: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    root.map(PathBuf::from)
        .unwrap_or_else(|| home_dir.unwrap_or_else(|| PathBuf::from(".")).join(".tfvm"))
}

/// Release name of the host operating system
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Release name of the host CPU architecture
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}
