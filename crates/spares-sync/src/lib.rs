//! Spares Sync Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pulls the spare-parts catalog from the upstream webhook, keeps a local
//! copy with an audit trail of every change, and publishes the catalog as a
//! delimited table to the downstream report API.
//!
//! # Pipeline
//!
//! - **Ingest**: page through the upstream until a short or empty page
//! - **Normalize**: map upstream spellings onto [`CanonicalRecord`], keeping
//!   unknown keys as extra fields
//! - **Store**: upsert by code, snapshotting the previous state on change
//! - **Render**: one line per stored record, ascending by code
//! - **Publish**: upload the table, then read back the results artifact
//!
//! # Example
//!
//! ```no_run
//! use spares_sync::{
//!     HttpCatalogClient, HttpReportClient, MemoryRecordStore, PipelineOptions, SyncConfig,
//!     SyncPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::load()?;
//!     let pipeline = SyncPipeline::new(
//!         HttpCatalogClient::new(&config.upstream, &config.tenant_id)?,
//!         MemoryRecordStore::new(),
//!         HttpReportClient::new(&config.report, &config.tenant_id)?,
//!         PipelineOptions::from(&config.pipeline),
//!     );
//!     let report = pipeline.run_full_sync().await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod store;
pub mod table;

pub use config::SyncConfig;
pub use error::{FailureKind, Result, SyncError};
pub use ingest::{CatalogSource, HttpCatalogClient};
pub use pipeline::{PipelineOptions, SyncPipeline, SyncReport, SyncStage};
pub use report::{HttpReportClient, ReportSink};
pub use spares_common::CanonicalRecord;
pub use store::{MemoryRecordStore, PgRecordStore, RecordStore, UpsertOutcome};
