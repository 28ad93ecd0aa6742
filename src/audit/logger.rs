//! Audit logger

use super::sinks::LogSink;
use super::types::LogEntry;
use crate::load::LoadRun;
use crate::types::Severity;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Records entries on their load run and in the durable sink
///
/// Never returns an error: a failed sink write is reported through
/// `tracing` and counted, and the caller's own result stands.
pub struct AuditLogger {
    sink: Arc<dyn LogSink>,
    failures: AtomicU64,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("sink", &self.sink.label())
            .field("failures", &self.failures())
            .finish()
    }
}

impl AuditLogger {
    /// Create a logger writing to `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            failures: AtomicU64::new(0),
        }
    }

    /// Log an INFO entry for a run
    pub async fn info(&self, run: &mut LoadRun, message: impl Into<String>) {
        self.record(run, Severity::Info, message.into()).await;
    }

    /// Log an ERROR entry for a run
    pub async fn error(&self, run: &mut LoadRun, message: impl Into<String>) {
        self.record(run, Severity::Error, message.into()).await;
    }

    /// Append an entry to the run and write it to the sink
    pub async fn record(&self, run: &mut LoadRun, severity: Severity, message: String) {
        let entry = LogEntry::new(run.id.clone(), severity, message);
        self.write(&entry).await;
        run.entries.push(entry);
    }

    /// Write an entry that belongs to no single run
    pub async fn write(&self, entry: &LogEntry) -> bool {
        tracing::debug!(
            load_run_id = %entry.load_run_id,
            severity = %entry.severity,
            message = %entry.message,
            "audit"
        );

        match self.sink.append(entry).await {
            Ok(()) => true,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    sink = %self.sink.label(),
                    load_run_id = %entry.load_run_id,
                    severity = %entry.severity,
                    message = %entry.message,
                    error = %e,
                    "Audit log write failed"
                );
                false
            }
        }
    }

    /// Make every written entry durable
    pub async fn flush(&self) -> bool {
        match self.sink.flush().await {
            Ok(()) => true,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    sink = %self.sink.label(),
                    error = %e,
                    "Audit log flush failed"
                );
                false
            }
        }
    }

    /// Number of failed writes and flushes so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Description of the underlying sink
    pub fn label(&self) -> String {
        self.sink.label()
    }
}
