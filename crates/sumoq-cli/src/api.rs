//! Sumo Logic API Client
//!
//! reqwest implementation of the search transport port.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

use sumoq::{ApiRequest, ApiResponse, ApiTransport, HttpMethod, SearchError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API Client for Sumo Logic
pub struct SumoClient {
    client: Client,
    base_url: String,
    access_id: String,
    access_key: String,
}

impl SumoClient {
    /// Create a new API client
    pub fn new(base_url: &str, access_id: &str, access_key: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            // Search jobs are bound to the session cookie set on creation
            .cookie_store(true)
            .user_agent(concat!("sumoq/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_id: access_id.to_string(),
            access_key: access_key.to_string(),
        })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl ApiTransport for SumoClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SearchError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(method(request.method), &url)
            .basic_auth(&self.access_id, Some(&self.access_key))
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| SearchError::transport(format!("Failed to connect to Sumo Logic API: {e}")))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| SearchError::transport(format!("Failed to read response: {e}")))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            match parsed {
                Ok(json) => json,
                // Error pages are not always JSON; keep them readable
                Err(_) if !(200..300).contains(&status) => Value::String(text),
                Err(e) => {
                    return Err(SearchError::Transport {
                        status: Some(status),
                        message: format!("Failed to parse response: {e}"),
                    })
                }
            }
        };

        Ok(ApiResponse::new(status, body))
    }
}
