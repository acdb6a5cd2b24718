//! Downstream report API client
//!
//! Publishing uploads the rendered table as one `text/csv` body. Results are
//! read from a separate endpoint; the report API scores uploads
//! asynchronously, so results may lag a fresh upload.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ReportConfig;
use crate::error::{ConfirmationError, PublishError, SyncError};

/// Content type declared for the uploaded table
pub const TABLE_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Receiver of the rendered table
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Upload the table and return the acknowledgment body
    async fn publish(&self, table: &str) -> Result<Value, PublishError>;

    /// Read the results artifact for the tenant
    async fn fetch_results(&self) -> Result<Value, ConfirmationError>;
}

pub struct HttpReportClient {
    client: Client,
    base_url: String,
    tenant_id: String,
    publish_timeout: Duration,
    results_timeout: Duration,
}

impl HttpReportClient {
    pub fn new(config: &ReportConfig, tenant_id: impl Into<String>) -> Result<Self, SyncError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SyncError::config(format!("Failed to build report HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
            publish_timeout: Duration::from_secs(config.publish_timeout_secs),
            results_timeout: Duration::from_secs(config.results_timeout_secs),
        })
    }

    pub fn publish_url(&self) -> String {
        format!("{}/students/{}/report/csv", self.base_url, self.tenant_id)
    }

    pub fn results_url(&self) -> String {
        format!("{}/students/{}/results", self.base_url, self.tenant_id)
    }
}

/// Decode a response body: JSON when possible, otherwise the raw text
fn body_value(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

async fn read_body(response: Response) -> Result<(u16, bool, String), reqwest::Error> {
    let status = response.status();
    let text = response.text().await?;
    Ok((status.as_u16(), status.is_success(), text))
}

#[async_trait]
impl ReportSink for HttpReportClient {
    async fn publish(&self, table: &str) -> Result<Value, PublishError> {
        let url = self.publish_url();
        debug!(url = %url, bytes = table.len(), "Uploading table");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, TABLE_CONTENT_TYPE)
            .timeout(self.publish_timeout)
            .body(table.to_string())
            .send()
            .await
            .map_err(|e| PublishError::Unreachable(e.to_string()))?;

        let (status, ok, text) = read_body(response)
            .await
            .map_err(|e| PublishError::Unreachable(e.to_string()))?;

        if !ok {
            return Err(PublishError::Rejected { status, body: text });
        }

        info!(status, "Table accepted by report API");
        Ok(body_value(text))
    }

    async fn fetch_results(&self) -> Result<Value, ConfirmationError> {
        let url = self.results_url();
        debug!(url = %url, "Reading results");

        let response = self
            .client
            .get(&url)
            .timeout(self.results_timeout)
            .send()
            .await
            .map_err(|e| ConfirmationError::Unreachable(e.to_string()))?;

        let (status, ok, text) = read_body(response)
            .await
            .map_err(|e| ConfirmationError::Unreachable(e.to_string()))?;

        if !ok {
            return Err(ConfirmationError::Rejected { status, body: text });
        }

        Ok(body_value(text))
    }
}
