//! Release archive download

use std::io::Write;

use semver::Version;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::PRODUCT;
use crate::install::error::InstallError;

/// URL of the release archive for a version and platform.
///
/// `https://releases.hashicorp.com/terraform/1.5.7/terraform_1.5.7_linux_amd64.zip`
pub fn archive_url(releases_url: &str, version: &Version, os: &str, arch: &str) -> String {
    format!(
        "{}/{version}/{PRODUCT}_{version}_{os}_{arch}.zip",
        releases_url.trim_end_matches('/')
    )
}

/// Stream an archive into a temporary file holding at most `max_bytes`.
///
/// The file is deleted when the returned handle is dropped or closed.
pub async fn download_archive(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
) -> Result<NamedTempFile, InstallError> {
    info!("Downloading {}", url);

    let download_error = |source| InstallError::Download {
        url: url.to_string(),
        source,
    };

    let mut response = client.get(url).send().await.map_err(download_error)?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(InstallError::UnexpectedStatus {
            url: url.to_string(),
            status,
        });
    }

    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(InstallError::DownloadTooLarge { limit: max_bytes });
    }

    let mut file = tempfile::Builder::new()
        .prefix("tfvm-")
        .suffix(".zip")
        .tempfile()
        .map_err(InstallError::io(
            "Failed to create temporary file in",
            std::env::temp_dir(),
        ))?;

    let mut received: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(download_error)? {
        received += chunk.len() as u64;
        if received > max_bytes {
            return Err(InstallError::DownloadTooLarge { limit: max_bytes });
        }
        file.write_all(&chunk).map_err(|source| InstallError::Io {
            message: "Failed to write",
            path: file.path().to_path_buf(),
            source,
        })?;
    }
    file.flush()
        .map_err(InstallError::io("Failed to write", file.path()))?;

    debug!("Downloaded {} bytes to {}", received, file.path().display());
    Ok(file)
}
