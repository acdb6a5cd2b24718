//! HTTP client for the upstream catalog webhook

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::CatalogSource;
use crate::config::UpstreamConfig;
use crate::error::{IngestionError, SyncError};

/// Header carrying the integration platform API key
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Body of one page request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageRequest<'a> {
    tenant_id: &'a Value,
    page: u32,
    size: u32,
}

/// Posts page requests to the upstream webhook
pub struct HttpCatalogClient {
    client: Client,
    endpoint: String,
    tenant_id: Value,
    api_key: Option<String>,
}

impl HttpCatalogClient {
    /// Create a client for the configured endpoint.
    ///
    /// A purely numeric tenant id is sent as a JSON number, anything else as
    /// a string.
    pub fn new(config: &UpstreamConfig, tenant_id: &str) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::config(format!("Failed to build upstream HTTP client: {}", e)))?;

        let tenant_id = tenant_id
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(tenant_id));

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            tenant_id,
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogClient {
    async fn fetch_page(&self, page: u32, size: u32) -> Result<Value, IngestionError> {
        let body = PageRequest {
            tenant_id: &self.tenant_id,
            page,
            size,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        debug!(page, size, url = %self.endpoint, "Requesting upstream page");

        let response = request.send().await.map_err(|e| IngestionError::Unreachable {
            page,
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IngestionError::Unreachable {
                page,
                message: format!("failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(IngestionError::Status {
                page,
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| IngestionError::malformed(page, format!("body is not JSON: {}", e)))
    }
}
