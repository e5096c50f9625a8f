//! Published releases of the CLI.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::downloader::ReleaseAsset;
use crate::http::HttpClient;
use crate::Result;

pub const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/oligo/tpix-cli/releases/latest";

/// Release metadata as published
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub html_url: String,
    /// Release notes
    #[serde(default)]
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// The latest release narrowed down to the asset for this platform
#[derive(Debug, Clone)]
pub struct Release {
    pub asset: ReleaseAsset,
    pub version: String,
    pub changelog: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Where release metadata comes from
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest_release(&self) -> Result<ReleaseInfo>;
}

/// Reads the latest release from the GitHub API
pub struct GithubReleases {
    http: Arc<HttpClient>,
    url: String,
}

impl GithubReleases {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_url(http, LATEST_RELEASE_URL)
    }

    pub fn with_url(http: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn latest_release(&self) -> Result<ReleaseInfo> {
        log::debug!("Fetching latest release from {}", self.url);
        self.http.get_json(&self.url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const RELEASE_JSON: &str = r#"{
        "id": 1,
        "html_url": "https://github.com/oligo/tpix-cli/releases/tag/v0.3.0",
        "tag_name": "v0.3.0",
        "published_at": "2025-03-01T12:00:00Z",
        "body": "* faster downloads",
        "assets": [
            {
                "id": 10,
                "name": "tpix-cli-linux-amd64.tar.gz",
                "size": 4096,
                "browser_download_url": "https://github.com/oligo/tpix-cli/releases/download/v0.3.0/tpix-cli-linux-amd64.tar.gz"
            }
        ]
    }"#;

    #[test]
    fn test_parse_release() {
        let release: ReleaseInfo = serde_json::from_str(RELEASE_JSON).unwrap();
        assert_eq!(release.tag_name, "v0.3.0");
        assert_eq!(release.body, "* faster downloads");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].size, 4096);
        assert!(release.assets[0].download_url.ends_with("linux-amd64.tar.gz"));
    }

    #[tokio::test]
    async fn test_github_releases_fetch() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = request.respond(tiny_http::Response::from_string(RELEASE_JSON));
            }
        });

        let source = GithubReleases::with_url(
            Arc::new(HttpClient::new().unwrap()),
            format!("http://127.0.0.1:{}/releases/latest", port),
        );
        let release = source.latest_release().await.unwrap();
        assert_eq!(release.tag_name, "v0.3.0");
    }
}
