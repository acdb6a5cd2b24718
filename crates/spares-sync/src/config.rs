//! Configuration management
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file. Every tunable has a documented default below; only the
//! tenant identity and the database URL are mandatory.

use std::str::FromStr;
use std::time::Duration;

use crate::store::DbConfig;

// ============================================================================
// Upstream Constants
// ============================================================================

/// Default base URL of the integration platform fronting the catalog.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:5678";

/// Default webhook path appended to the upstream base URL.
pub const DEFAULT_UPSTREAM_PATH: &str = "/webhook/spares";

/// Default timeout for one upstream page request in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Report API Constants
// ============================================================================

/// Default base URL of the downstream report API.
pub const DEFAULT_REPORT_URL: &str = "http://localhost:8080";

/// Default timeout for the table upload in seconds.
pub const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 60;

/// Default timeout for the results read in seconds.
pub const DEFAULT_RESULTS_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Pipeline Constants
// ============================================================================

/// Records requested per upstream page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pause between publishing and reading back results, in milliseconds.
/// The report API scores uploads asynchronously.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Cell separator of the published table.
pub const DEFAULT_CSV_SEPARATOR: &str = ";";

/// Full runtime configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identity sent to both upstream and downstream systems
    pub tenant_id: String,
    pub upstream: UpstreamConfig,
    pub report: ReportConfig,
    pub pipeline: PipelineConfig,
    pub database: DbConfig,
}

/// Upstream catalog endpoint
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub path: String,
    /// Sent as `X-N8N-API-KEY` when present
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Full URL that page requests are posted to
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

/// Downstream report API
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub base_url: String,
    pub publish_timeout_secs: u64,
    pub results_timeout_secs: u64,
}

/// Pipeline behaviour
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub page_size: u32,
    pub settle_delay_ms: u64,
    pub csv_separator: String,
    /// Append one column per discovered extra field when publishing
    pub csv_all_fields: bool,
}

impl PipelineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            csv_separator: DEFAULT_CSV_SEPARATOR.to_string(),
            csv_all_fields: false,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl SyncConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Read the environment without validating
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(SyncConfig {
            tenant_id: std::env::var("SPARES_TENANT_ID").unwrap_or_default(),
            upstream: UpstreamConfig {
                base_url: env_string("SPARES_UPSTREAM_URL", DEFAULT_UPSTREAM_URL),
                path: env_string("SPARES_UPSTREAM_PATH", DEFAULT_UPSTREAM_PATH),
                api_key: std::env::var("SPARES_UPSTREAM_API_KEY")
                    .ok()
                    .filter(|key| !key.is_empty()),
                timeout_secs: env_parse(
                    "SPARES_UPSTREAM_TIMEOUT_SECS",
                    DEFAULT_UPSTREAM_TIMEOUT_SECS,
                ),
            },
            report: ReportConfig {
                base_url: env_string("SPARES_REPORT_URL", DEFAULT_REPORT_URL),
                publish_timeout_secs: env_parse(
                    "SPARES_PUBLISH_TIMEOUT_SECS",
                    DEFAULT_PUBLISH_TIMEOUT_SECS,
                ),
                results_timeout_secs: env_parse(
                    "SPARES_RESULTS_TIMEOUT_SECS",
                    DEFAULT_RESULTS_TIMEOUT_SECS,
                ),
            },
            pipeline: PipelineConfig {
                page_size: env_parse("SPARES_PAGE_SIZE", DEFAULT_PAGE_SIZE),
                settle_delay_ms: env_parse("SPARES_SETTLE_DELAY_MS", DEFAULT_SETTLE_DELAY_MS),
                csv_separator: env_string("SPARES_CSV_SEPARATOR", DEFAULT_CSV_SEPARATOR),
                csv_all_fields: env_parse("SPARES_CSV_ALL_FIELDS", false),
            },
            database: DbConfig::from_env()?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tenant_id.trim().is_empty() {
            anyhow::bail!("SPARES_TENANT_ID must be set to a non-empty value");
        }

        if self.upstream.base_url.is_empty() {
            anyhow::bail!("Upstream URL cannot be empty");
        }

        if self.report.base_url.is_empty() {
            anyhow::bail!("Report API URL cannot be empty");
        }

        if self.pipeline.page_size == 0 {
            anyhow::bail!("Page size must be greater than 0");
        }

        if self.pipeline.csv_separator.is_empty() {
            anyhow::bail!("CSV separator cannot be empty");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot exceed max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        Ok(())
    }
}
