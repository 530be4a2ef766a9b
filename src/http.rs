//! Shared HTTP client construction

use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("tfvm/", env!("CARGO_PKG_VERSION"));

/// Build a client with a bounded overall timeout and TLS 1.2 as the floor.
pub fn client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .build()
}
