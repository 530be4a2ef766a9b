//! Remote release index
//!
//! The index is an HTML page listing one anchor per release, each pointing at
//! `/terraform/<version>/`. Only the href targets are inspected.

use std::sync::LazyLock;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::PRODUCT;
use crate::http;
use crate::version::error::CatalogError;

static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("anchor href pattern")
});

static RELEASE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^/{}/([^/]+)/$", regex::escape(PRODUCT))).expect("release path pattern")
});

/// Source of release names advertised remotely
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseIndex: Send + Sync {
    /// Fetch raw release names in index order.
    ///
    /// Names are not validated; catalog filtering drops anything that is not
    /// a version.
    async fn fetch_release_names(&self) -> Result<Vec<String>, CatalogError>;
}

/// Largest index page accepted, well above the size of the real listing
pub const DEFAULT_MAX_INDEX_BYTES: u64 = 8 * 1024 * 1024;

/// Release index served over HTTP
pub struct HttpReleaseIndex {
    client: reqwest::Client,
    index_url: String,
    max_bytes: u64,
}

impl HttpReleaseIndex {
    pub fn new(index_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        Ok(Self {
            client: http::client(timeout)?,
            index_url: index_url.trim_end_matches('/').to_string(),
            max_bytes: DEFAULT_MAX_INDEX_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait::async_trait]
impl ReleaseIndex for HttpReleaseIndex {
    async fn fetch_release_names(&self) -> Result<Vec<String>, CatalogError> {
        let url = format!("{}/", self.index_url);
        debug!("Fetching release index {}", url);

        let mut response = self.client.get(&url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Release index returned status {}: {}", status, url);
            return Err(CatalogError::UnexpectedStatus { url, status });
        }

        let too_large = || CatalogError::IndexTooLarge {
            limit: self.max_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        let names = extract_release_names(&String::from_utf8_lossy(&body));
        debug!("Release index listed {} candidates", names.len());
        Ok(names)
    }
}

/// Extract release names from anchor hrefs of the form `/terraform/<name>/`.
pub fn extract_release_names(html: &str) -> Vec<String> {
    ANCHOR_HREF
        .captures_iter(html)
        .filter_map(|caps| {
            RELEASE_PATH
                .captures(&caps[1])
                .map(|release| release[1].to_string())
        })
        .collect()
}
