use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use super::model::{
    DependenciesResponse, PackageResponse, PackageVersionsResponse, SearchResponse, UploadResponse,
};
use super::Registry;
use crate::config::Config;
use crate::downloader::ReleaseAsset;
use crate::http::{HttpClient, HttpClientConfig};
use crate::{PackageRef, PackageSpec, Result, TpixError};

/// Client for the tpix registry REST API
pub struct TpixClient {
    http: Arc<HttpClient>,
    base_url: String,
}

impl TpixClient {
    /// Create a client for the configured server, authenticated with the
    /// stored access token when there is one
    pub fn new(config: &Config) -> Result<Self> {
        let mut http_config = HttpClientConfig::new();
        if let Some(token) = config.access_token() {
            http_config = http_config.with_bearer_token(token.to_string());
        }
        let http = Arc::new(HttpClient::with_config(http_config)?);

        Self::with_http_client(http, config.server_url())
    }

    pub fn with_http_client(http: Arc<HttpClient>, base_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| TpixError::Config(format!("invalid server URL {}: {}", base_url, e)))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Shared HTTP client, for handing to a [`Downloader`](crate::Downloader)
    pub fn http_client(&self) -> Arc<HttpClient> {
        Arc::clone(&self.http)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn package_path(namespace: &str, name: &str) -> String {
        format!(
            "/packages/{}/{}",
            urlencoding::encode(namespace),
            urlencoding::encode(name)
        )
    }

    async fn fetch_versions(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PackageVersionsResponse> {
        let url = self.endpoint(&format!("{}/versions", Self::package_path(namespace, name)));
        self.http.get_json(&url).await
    }

    /// Pin `spec` to a version, looking up the newest published one when
    /// none was given
    pub async fn resolve_spec(&self, spec: &PackageSpec) -> Result<PackageRef> {
        if let Some(version) = &spec.version {
            return spec.with_version(version.clone());
        }

        let package = self.fetch_package(&spec.namespace, &spec.name).await?;
        let version = package.newest_version().ok_or_else(|| {
            TpixError::PackageNotFound(format!(
                "no versions published for @{}/{}",
                spec.namespace, spec.name
            ))
        })?;

        log::debug!("Using latest version {} of @{}/{}", version, spec.namespace, spec.name);
        spec.with_version(version.to_string())
    }
}

#[async_trait]
impl Registry for TpixClient {
    async fn search_packages(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<SearchResponse> {
        let mut url = self.endpoint(&format!("/search?q={}", urlencoding::encode(query)));
        if let Some(namespace) = namespace.filter(|n| !n.is_empty()) {
            url.push_str(&format!("&namespace={}", urlencoding::encode(namespace)));
        }
        if limit > 0 {
            url.push_str(&format!("&limit={}", limit));
        }

        self.http.get_json(&url).await
    }

    async fn fetch_package(&self, namespace: &str, name: &str) -> Result<PackageResponse> {
        let url = self.endpoint(&Self::package_path(namespace, name));
        let mut package: PackageResponse = self.http.get_json(&url).await.map_err(|e| match e {
            TpixError::HttpStatus { status: 404, .. } => {
                TpixError::PackageNotFound(format!("@{}/{}", namespace, name))
            }
            other => other,
        })?;

        match self.fetch_versions(namespace, name).await {
            Ok(versions) if !versions.versions.is_empty() => package.versions = versions.versions,
            Ok(_) => {}
            Err(e) => log::debug!("Version list for @{}/{} unavailable: {}", namespace, name, e),
        }

        Ok(package)
    }

    async fn fetch_dependencies(&self, pkg: &PackageRef) -> Result<Vec<PackageRef>> {
        let url = self.endpoint(&format!(
            "{}/{}/dependencies",
            Self::package_path(pkg.namespace(), pkg.name()),
            urlencoding::encode(pkg.version())
        ));
        let response: DependenciesResponse = self.http.get_json(&url).await?;
        Ok(response.dependencies)
    }

    async fn package_asset(&self, pkg: &PackageRef) -> Result<ReleaseAsset> {
        let url = self.endpoint(&format!(
            "/download/{}/{}/{}",
            urlencoding::encode(pkg.namespace()),
            urlencoding::encode(pkg.name()),
            urlencoding::encode(pkg.version())
        ));

        // The download endpoint does not announce a size up front
        Ok(ReleaseAsset::new(
            format!("{}-{}.tar.gz", pkg.name(), pkg.version()),
            url,
            0,
        ))
    }

    async fn upload_package(&self, path: &Path, namespace: &str) -> Result<UploadResponse> {
        if !self.http.has_bearer_token() {
            return Err(TpixError::Precondition(
                "uploading requires an access token".to_string(),
            ));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TpixError::Precondition(format!("not a file: {}", path.display())))?;
        let data = tokio::fs::read(path).await?;
        log::debug!("Uploading {} ({} bytes) to {}", file_name, data.len(), namespace);

        let form = Form::new()
            .part("file", Part::bytes(data).file_name(file_name))
            .text("namespace", namespace.to_string());

        let request = self
            .http
            .request(Method::POST, &self.endpoint("/packages/upload"))
            .multipart(form);
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        match status {
            200 | 201 => Ok(serde_json::from_str(&body)?),
            _ => {
                // Validation failures come back with a report and no digest
                if let Ok(rejected) = serde_json::from_str::<UploadResponse>(&body) {
                    if !rejected.validate_report.is_empty() {
                        return Ok(rejected);
                    }
                }
                Err(TpixError::Registry(format!(
                    "upload failed with status {}: {}",
                    status,
                    body.trim()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    /// Serve canned responses keyed by path prefix, recording request URLs
    fn serve(routes: Vec<(&'static str, u16, &'static str)>, requests: usize) -> (String, mpsc::Receiver<String>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for _ in 0..requests {
                let Ok(request) = server.recv() else { break };
                let url = request.url().to_string();
                let _ = tx.send(url.clone());

                let route = routes
                    .iter()
                    .filter(|(prefix, _, _)| url.starts_with(prefix))
                    .max_by_key(|(prefix, _, _)| prefix.len());
                let response = match route {
                    Some((_, status, body)) => {
                        tiny_http::Response::from_string(*body).with_status_code(*status)
                    }
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        (format!("http://127.0.0.1:{}", port), rx)
    }

    fn client(base_url: &str) -> TpixClient {
        TpixClient::new(&Config::default().with_server_url(base_url)).unwrap()
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let (url, requests) = serve(
            vec![(
                "/api/v1/search",
                200,
                r#"{"query":"fancy table","count":1,"results":[{"namespace":"preview","name":"tablex","description":"Tables"}]}"#,
            )],
            1,
        );

        let response = client(&url)
            .search_packages("fancy table", Some("preview"), 5)
            .await
            .unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].name, "tablex");
        assert_eq!(
            requests.recv().unwrap(),
            "/api/v1/search?q=fancy%20table&namespace=preview&limit=5"
        );
    }

    #[tokio::test]
    async fn test_fetch_package_merges_versions() {
        let (url, _requests) = serve(
            vec![
                (
                    "/api/v1/packages/preview/cetz",
                    200,
                    r#"{"name":"cetz","namespace":"preview","versions":[]}"#,
                ),
                (
                    "/api/v1/packages/preview/cetz/versions",
                    200,
                    r#"{"versions":[{"version":"0.2.1"},{"version":"0.2.2"}]}"#,
                ),
            ],
            2,
        );

        let package = client(&url).fetch_package("preview", "cetz").await.unwrap();
        assert_eq!(package.versions.len(), 2);
        assert_eq!(package.newest_version(), Some("0.2.2"));
    }

    #[tokio::test]
    async fn test_fetch_package_not_found() {
        let (url, _requests) = serve(vec![], 1);

        let result = client(&url).fetch_package("preview", "missing").await;
        assert!(matches!(result, Err(TpixError::PackageNotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_spec_uses_last_version() {
        let (url, _requests) = serve(
            vec![
                ("/api/v1/packages/preview/cetz", 200, r#"{"name":"cetz"}"#),
                (
                    "/api/v1/packages/preview/cetz/versions",
                    200,
                    r#"{"versions":[{"version":"0.1.0"},{"version":"0.2.0"}]}"#,
                ),
            ],
            2,
        );

        let spec: PackageSpec = "@preview/cetz".parse().unwrap();
        let pkg = client(&url).resolve_spec(&spec).await.unwrap();
        assert_eq!(pkg.key(), "@preview/cetz:0.2.0");
    }

    #[tokio::test]
    async fn test_resolve_spec_with_version_skips_lookup() {
        let client = client("http://127.0.0.1:9");
        let spec: PackageSpec = "@preview/cetz:0.1.0".parse().unwrap();
        assert_eq!(client.resolve_spec(&spec).await.unwrap().version(), "0.1.0");
    }

    #[tokio::test]
    async fn test_fetch_dependencies() {
        let (url, requests) = serve(
            vec![(
                "/api/v1/packages/preview/cetz/0.2.2/dependencies",
                200,
                r#"{"dependencies":[{"namespace":"preview","name":"oxifmt","version":"0.2.0"}]}"#,
            )],
            1,
        );

        let pkg = PackageRef::new("preview", "cetz", "0.2.2");
        let deps = client(&url).fetch_dependencies(&pkg).await.unwrap();
        assert_eq!(deps, vec![PackageRef::new("preview", "oxifmt", "0.2.0")]);
        assert_eq!(
            requests.recv().unwrap(),
            "/api/v1/packages/preview/cetz/0.2.2/dependencies"
        );
    }

    #[tokio::test]
    async fn test_package_asset_url() {
        let client = client("http://registry.local/");
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");

        let asset = client.package_asset(&pkg).await.unwrap();
        assert_eq!(asset.name, "cetz-0.2.2.tar.gz");
        assert_eq!(
            asset.download_url,
            "http://registry.local/api/v1/download/preview/cetz/0.2.2"
        );
        assert_eq!(asset.size, 0);
    }

    #[tokio::test]
    async fn test_upload_requires_token() {
        let client = client("http://127.0.0.1:9");
        let result = client
            .upload_package(Path::new("/tmp/pkg.tar.gz"), "preview")
            .await;
        assert!(matches!(result, Err(TpixError::Precondition(_))));
    }

    #[test]
    fn test_invalid_server_url() {
        let config = Config::default().with_server_url("not a url");
        assert!(matches!(TpixClient::new(&config), Err(TpixError::Config(_))));
    }
}
