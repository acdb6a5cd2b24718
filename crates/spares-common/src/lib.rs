//! Spares Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the spares synchronization
//! workspace.
//!
//! # Overview
//!
//! - **Types**: the canonical spare record, audit snapshots and the typed
//!   side-channel for fields the canonical schema does not know about
//! - **Error Handling**: validation errors raised before a record is stored
//! - **Logging**: centralized `tracing` setup used by every binary
//!
//! # Example
//!
//! ```no_run
//! use spares_common::types::CanonicalRecord;
//!
//! let record = CanonicalRecord::new("X1", "Bolt");
//! assert!(record.validate().is_ok());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::ValidationError;
pub use types::{AuditEntry, CanonicalRecord, ChangeReason, ExtraFields, ExtraValue};
