//! Mock release server

use mockito::{Mock, ServerGuard};

/// Index page listing the given versions the way the release server does
pub fn index_html(versions: &[&str]) -> String {
    let items: String = versions
        .iter()
        .map(|v| format!("    <li><a href=\"/terraform/{v}/\">terraform_{v}</a></li>\n"))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html>\n<body>\n  <ul>\n    <li><a href=\"../\">../</a></li>\n\
         {items}  </ul>\n</body>\n</html>\n"
    )
}

/// Serve the index, expecting `hits` requests
pub async fn mock_index(server: &mut ServerGuard, versions: &[&str], hits: usize) -> Mock {
    server
        .mock("GET", "/terraform/")
        .expect(hits)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(index_html(versions))
        .create_async()
        .await
}

pub fn archive_path(version: &str) -> String {
    format!("/terraform/{version}/terraform_{version}_linux_amd64.zip")
}

/// Serve a release archive, expecting `hits` downloads
pub async fn mock_archive(
    server: &mut ServerGuard,
    version: &str,
    body: Vec<u8>,
    hits: usize,
) -> Mock {
    server
        .mock("GET", archive_path(version).as_str())
        .expect(hits)
        .with_status(200)
        .with_header("content-type", "application/zip")
        .with_body(body)
        .create_async()
        .await
}
