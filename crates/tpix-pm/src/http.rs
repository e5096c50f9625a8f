//! HTTP client for registry and release downloads.
//!
//! A thin wrapper around `reqwest` that applies the client user agent, an
//! optional bearer token and a generous overall timeout, and turns
//! non-success statuses into [`TpixError::HttpStatus`]. Requests are never
//! retried; a failed operation is reissued by the caller.
//!
//! ```no_run
//! use tpix_pm::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> tpix_pm::Result<()> {
//! let config = HttpClientConfig::new()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_bearer_token("token".to_string());
//! let client = HttpClient::with_config(config)?;
//!
//! let response = client.get("https://tpix.typstify.com/api/v1/search?q=cetz").await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{Result, TpixError};

pub const DEFAULT_USER_AGENT: &str = "tpix-client/v1.0.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpClient {
    client: Client,
    user_agent: String,
    bearer_token: Option<String>,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            // Downloads are checked byte for byte against the announced size
            .no_gzip()
            .build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
            bearer_token: config.bearer_token.filter(|t| !t.is_empty()),
        })
    }

    /// Start a request with authentication applied
    pub fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a prepared request, failing on non-success statuses
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();

        log::debug!("HTTP {} {}", status.as_u16(), url);

        if status.is_success() {
            Ok(response)
        } else {
            Err(TpixError::HttpStatus {
                status: status.as_u16(),
                url,
            })
        }
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(self.request(reqwest::Method::GET, url)).await
    }

    /// GET JSON and deserialize
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn has_bearer_token(&self) -> bool {
        self.bearer_token.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub bearer_token: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bearer_token: None,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.user_agent, "tpix-client/v1.0.0");
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = HttpClientConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(5))
            .with_user_agent("Test/1.0".to_string())
            .with_bearer_token("abc".to_string());

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "Test/1.0");
        assert_eq!(config.bearer_token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_empty_token_is_ignored() {
        let client =
            HttpClient::with_config(HttpClientConfig::new().with_bearer_token(String::new()))
                .unwrap();
        assert!(!client.has_bearer_token());
        assert_eq!(client.user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_http_status_display() {
        let err = TpixError::HttpStatus {
            status: 404,
            url: "https://example.com/missing".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: https://example.com/missing");
    }
}
