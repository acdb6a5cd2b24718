//! Sync pipeline orchestration
//!
//! A full run moves through
//! `Idle -> Ingesting -> Upserting -> Serializing -> Publishing -> ConfirmingResults -> Done`
//! strictly in sequence. Any stage error ends the run in `Failed` and is
//! returned with its [`FailureKind`](crate::error::FailureKind) intact. The
//! confirmation read is best effort: when it fails the run still succeeds and
//! reports the publish acknowledgment instead.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{ConfirmationError, Result, SyncError};
use crate::ingest::{fetch_all, CatalogSource};
use crate::normalize::normalize;
use crate::report::ReportSink;
use crate::store::{RecordStore, UpsertOutcome};
use crate::table;

/// Message reported when there is nothing to publish
pub const EMPTY_TABLE_MESSAGE: &str = "empty";

/// Position of a run in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Idle,
    Ingesting,
    Upserting,
    Serializing,
    Publishing,
    ConfirmingResults,
    Done,
    Failed,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ingesting => "ingesting",
            Self::Upserting => "upserting",
            Self::Serializing => "serializing",
            Self::Publishing => "publishing",
            Self::ConfirmingResults => "confirming_results",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upstream to store summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSummary {
    pub synced: usize,
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Page requests issued to the upstream
    pub requests: u32,
}

/// Store to report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    pub synced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Acknowledgment body from the report API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Outcome of a full run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: Uuid,
    pub upstream: UpstreamSummary,
    /// Absent when the upstream returned no records
    pub publish: Option<PublishSummary>,
    /// Results artifact, or the publish acknowledgment when it could not be read
    pub results: Option<Value>,
    /// Whether `results` came from the results endpoint
    pub results_confirmed: bool,
    pub stages: Vec<SyncStage>,
}

/// Runtime knobs of a pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub page_size: u32,
    pub settle_delay: Duration,
    pub separator: String,
    pub all_fields: bool,
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            page_size: config.page_size,
            settle_delay: config.settle_delay(),
            separator: config.csv_separator.clone(),
            all_fields: config.csv_all_fields,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Records stage transitions of one run
struct StageTracker {
    run_id: Uuid,
    stages: Vec<SyncStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stages: vec![SyncStage::Idle],
        }
    }

    fn enter(&mut self, stage: SyncStage) {
        info!(run_id = %self.run_id, stage = %stage, "Entering stage");
        self.stages.push(stage);
    }

    fn current(&self) -> SyncStage {
        self.stages.last().copied().unwrap_or(SyncStage::Idle)
    }

    fn fail(&mut self, err: SyncError) -> SyncError {
        error!(
            run_id = %self.run_id,
            stage = %self.current(),
            kind = %err.kind(),
            error = %err,
            "Sync run failed"
        );
        self.stages.push(SyncStage::Failed);
        err
    }
}

/// Wires a catalog source, a record store and a report sink together
pub struct SyncPipeline<C, S, R> {
    source: C,
    store: S,
    sink: R,
    options: PipelineOptions,
}

impl<C, S, R> SyncPipeline<C, S, R>
where
    C: CatalogSource,
    S: RecordStore,
    R: ReportSink,
{
    pub fn new(source: C, store: S, sink: R, options: PipelineOptions) -> Self {
        Self {
            source,
            store,
            sink,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Fetch the upstream catalog and upsert every record in fetch order
    pub async fn sync_upstream_to_store(&self) -> Result<UpstreamSummary> {
        let mut tracker = StageTracker::new();
        self.ingest_and_upsert(&mut tracker)
            .await
            .map_err(|e| tracker.fail(e))
    }

    /// Render the full stored catalog and publish it
    pub async fn sync_store_to_report(&self) -> Result<PublishSummary> {
        let mut tracker = StageTracker::new();
        self.render_and_publish(&mut tracker)
            .await
            .map_err(|e| tracker.fail(e))
    }

    /// Read the results artifact without publishing
    pub async fn fetch_results(&self) -> std::result::Result<Value, ConfirmationError> {
        self.sink.fetch_results().await
    }

    /// Run every stage in order
    pub async fn run_full_sync(&self) -> Result<SyncReport> {
        let mut tracker = StageTracker::new();
        info!(run_id = %tracker.run_id, "Starting full sync");

        let upstream = match self.ingest_and_upsert(&mut tracker).await {
            Ok(summary) => summary,
            Err(e) => return Err(tracker.fail(e)),
        };

        let publish = if upstream.total == 0 {
            info!(run_id = %tracker.run_id, "No upstream records; skipping publish");
            None
        } else {
            match self.render_and_publish(&mut tracker).await {
                Ok(summary) => Some(summary),
                Err(e) => return Err(tracker.fail(e)),
            }
        };

        tracker.enter(SyncStage::ConfirmingResults);
        tokio::time::sleep(self.options.settle_delay).await;

        let (results, results_confirmed) = match self.sink.fetch_results().await {
            Ok(results) => (Some(results), true),
            Err(e) => {
                warn!(
                    run_id = %tracker.run_id,
                    error = %e,
                    "Could not read results; reporting publish acknowledgment instead"
                );
                (publish.as_ref().and_then(|p| p.result.clone()), false)
            },
        };

        tracker.enter(SyncStage::Done);
        info!(
            run_id = %tracker.run_id,
            synced = upstream.synced,
            results_confirmed,
            "Full sync completed"
        );

        Ok(SyncReport {
            run_id: tracker.run_id,
            upstream,
            publish,
            results,
            results_confirmed,
            stages: tracker.stages,
        })
    }

    async fn ingest_and_upsert(&self, tracker: &mut StageTracker) -> Result<UpstreamSummary> {
        tracker.enter(SyncStage::Ingesting);
        let fetch = fetch_all(&self.source, self.options.page_size).await?;

        let mut summary = UpstreamSummary {
            total: fetch.records.len(),
            requests: fetch.requests,
            ..UpstreamSummary::default()
        };

        if fetch.records.is_empty() {
            return Ok(summary);
        }

        tracker.enter(SyncStage::Upserting);
        for raw in &fetch.records {
            let record = normalize(raw)?;
            match self.store.upsert(&record).await? {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated { .. } => summary.updated += 1,
                UpsertOutcome::Unchanged => summary.unchanged += 1,
            }
            summary.synced += 1;
        }

        info!(
            run_id = %tracker.run_id,
            synced = summary.synced,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "Upstream catalog stored"
        );

        Ok(summary)
    }

    async fn render_and_publish(&self, tracker: &mut StageTracker) -> Result<PublishSummary> {
        tracker.enter(SyncStage::Serializing);
        let records = self.store.get_all().await?;

        let text = if self.options.all_fields {
            table::render_with_all_fields(&records, &self.options.separator)
        } else {
            table::render_default(&records, &self.options.separator)
        };

        if text.trim().is_empty() {
            info!(run_id = %tracker.run_id, "Rendered table is empty; skipping upload");
            return Ok(PublishSummary {
                synced: 0,
                message: Some(EMPTY_TABLE_MESSAGE.to_string()),
                result: None,
            });
        }

        tracker.enter(SyncStage::Publishing);
        let result = self.sink.publish(&text).await?;

        Ok(PublishSummary {
            synced: records.len(),
            message: None,
            result: Some(result),
        })
    }
}
