//! Audit logging
//!
//! Append-only record of every statement executed and every error
//! encountered, keyed by load run.
//!
//! # Features
//!
//! - **Sinks**: Warehouse table, JSON-lines file, memory, fan-out
//! - **Non-masking**: A failed log write never changes a run's outcome
//! - **Fallback**: Failed writes are reported through `tracing`

mod logger;
mod sinks;
mod types;

pub use logger::AuditLogger;
pub use sinks::{FanoutSink, JsonlLogSink, LogSink, MemoryLogSink};
pub use types::LogEntry;
