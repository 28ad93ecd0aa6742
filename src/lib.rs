// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # flatload
//!
//! Loads delimited flat files of unknown schema into a columnar warehouse.
//! Every file is profiled, its inferred schema reconciled with the
//! destination table, and the data bulk-loaded, with every statement and
//! error written to an audit log.
//!
//! ## Features
//!
//! - **Type Profiling**: Closed type set with monotonic widening
//! - **Schema Reconciliation**: CREATE, COMPATIBLE, WIDEN or REJECT
//! - **Audited Loads**: Each statement logged before and after it runs
//! - **Failure Isolation**: One bad file never aborts the batch
//! - **DuckDB Warehouse**: Embedded, transactional bulk loads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flatload::{BatchCoordinator, AuditLogger, DuckDbWarehouse, LoaderConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> flatload::Result<()> {
//!     let config = LoaderConfig::default();
//!     let warehouse = Arc::new(
//!         DuckDbWarehouse::open("dw.duckdb", &[])?
//!             .with_audit_table("load_audit_log")
//!             .await?,
//!     );
//!     let audit = Arc::new(AuditLogger::new(warehouse.clone()));
//!
//!     let files = flatload::source::expand_inputs(&["data/*.csv".to_string()])?;
//!     let result = BatchCoordinator::new(config, warehouse, audit).run(&files).await;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Batch Coordinator                         │
//! │   files → LoadRun per file → BatchResult (+ summary LogEntry)    │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │ per file
//! ┌──────────────┬────────────────┴──┬────────────────┬──────────────┐
//! │ Type Profiler│ Schema Reconciler │  Load Executor │ Audit Logger │
//! ├──────────────┼───────────────────┼────────────────┼──────────────┤
//! │ CSV dialect  │ CREATE            │ DDL            │ LoadRun      │
//! │ Sampling     │ COMPATIBLE        │ Bulk load      │ Warehouse    │
//! │ Widening     │ WIDEN             │ Cleanup        │ JSONL file   │
//! │ Sanitizing   │ REJECT            │ Timeouts       │ Fallback     │
//! └──────────────┴───────────────────┴────────────────┴──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for flatload
pub mod error;

/// Common types
pub mod types;

/// Configuration loading and validation
pub mod config;

/// Destination naming templates
pub mod template;

/// Source files, CSV dialects and input discovery
pub mod source;

/// Type profiling and schema reconciliation
pub mod schema;

/// Warehouse collaborator and DuckDB implementation
pub mod warehouse;

/// Audit logging
pub mod audit;

/// Load runs and the load executor
pub mod load;

/// Batch coordination
pub mod batch;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result, ResultExt};
pub use types::*;

// Re-export commonly used types
pub use audit::{AuditLogger, LogEntry, LogSink};
pub use batch::{BatchCoordinator, BatchResult, ExitStatus};
pub use config::{load_config, load_config_from_str, LoaderConfig};
pub use load::{LoadExecutor, LoadRun};
pub use schema::{reconcile, ReconcileAction, ReconcilePlan, TableSchema, TypeProfiler};
pub use source::SourceFile;
pub use warehouse::{DuckDbWarehouse, Warehouse};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
