//! Shared HTTP plumbing for OpenAI-compatible providers.
//!
//! `BaseClient` owns the endpoint, credentials and extra headers captured at
//! construction. It is immutable afterwards, so one instance can serve any
//! number of concurrent requests.

use super::types::{ChatCompletion, ChatRequest, ModelList};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::{ProviderError, ProviderResult};
use serde::de::DeserializeOwned;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport and auth configuration for one provider endpoint.
#[derive(Debug, Clone)]
pub struct BaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl BaseClient {
    /// Create a client for `base_url`.
    ///
    /// Trailing slashes are removed. An empty API key is treated as no key,
    /// in which case no `Authorization` header is sent.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(String::from),
            headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Point the client at a different endpoint root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a Chat Completions request.
    pub async fn chat_completion(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion> {
        let url = self.url("chat/completions");
        tracing::debug!("POST {url} (model: {})", request.model);

        let resp = self
            .authorize(self.http.post(&url))
            .json(request)
            .timeout(self.timeout)
            .send()
            .await?;

        read_json(resp).await
    }

    /// GET an absolute URL and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ProviderResult<T> {
        let resp = self
            .authorize(self.http.get(url))
            .timeout(self.timeout)
            .send()
            .await?;

        read_json(resp).await
    }

    /// GET an absolute URL and succeed on any 2xx status.
    ///
    /// Sends the same credentials and headers as every other request, with a
    /// short fixed timeout.
    pub async fn ping(&self, url: &str) -> ProviderResult<()> {
        let resp = self
            .authorize(self.http.get(url))
            .timeout(PING_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::Api {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }

    /// List model ids from `GET {base_url}/models`.
    pub async fn list_models(&self) -> ProviderResult<Vec<String>> {
        let list: ModelList = self.get_json(&self.url("models")).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    fn authorize(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> ProviderResult<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to read error body for HTTP {status}: {e}");
                String::new()
            }
        };
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}
