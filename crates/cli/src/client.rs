//! API client for the monitoring service metadata endpoints

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use meta_lib::MetadataFetcher;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// API client authenticated with the agent's API key
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut key = HeaderValue::from_str(api_key).context("Invalid API key")?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", key);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("check-meta/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid API URL: {}", base_url));
        }

        Ok(Self { client, base_url })
    }

    /// URL of an API path, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid API URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body.trim());
        }

        response.json().await.context("Failed to parse response")
    }
}

#[async_trait]
impl MetadataFetcher for ApiClient {
    async fn fetch_metadata(&self, host_id: &str, namespace: &str) -> Result<Value> {
        let url = self.endpoint(&["api", "v0", "hosts", host_id, "metadata", namespace])?;
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meta_lib::fetch_value;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::new("https://api.example.com", "key").unwrap();
        let url = client
            .endpoint(&["api", "v0", "hosts", "abc", "metadata", "my ns/x"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v0/hosts/abc/metadata/my%20ns%2Fx"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new("https://proxy.example.com/mackerel/", "key").unwrap();
        let url = client.endpoint(&["api", "v0"]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/mackerel/api/v0");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", "key").is_err());
        assert!(ApiClient::new("mailto:ops@example.com", "key").is_err());
    }

    #[tokio::test]
    async fn test_fetch_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v0/hosts/host-1/metadata/app")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version": "1.2.3", "replicas": 3, "enabled": true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "secret").unwrap();
        let document = client.fetch_metadata("host-1", "app").await.unwrap();
        assert_eq!(document["version"], "1.2.3");
        assert_eq!(document["replicas"], 3);
        assert_eq!(document["enabled"], true);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_metadata_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v0/hosts/host-1/metadata/missing")
            .with_status(404)
            .with_body(r#"{"error":{"message":"Metadata not found"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "secret").unwrap();
        let err = client.fetch_metadata("host-1", "missing").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"), "{}", message);
        assert!(message.contains("Metadata not found"), "{}", message);
    }

    #[tokio::test]
    async fn test_fetch_value_through_client() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v0/hosts/host-1/metadata/app")
            .with_status(200)
            .with_body(r#"{"version": "1.2.3"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "secret").unwrap();
        let value = fetch_value(&client, "host-1", "app", "version").await.unwrap();
        assert_eq!(value, Value::String("1.2.3".to_string()));

        let err = fetch_value(&client, "host-1", "app", "other").await.unwrap_err();
        assert_eq!(err.to_string(), "meta key does not exist: other");
    }
}
