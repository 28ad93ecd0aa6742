//! Log sink implementations

use super::types::LogEntry;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only destination for audit entries
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: &LogEntry) -> Result<()>;

    /// Make every appended entry durable
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Human-readable description for diagnostics
    fn label(&self) -> String;
}

// ============================================================================
// JSON Lines File
// ============================================================================

/// Appends one JSON object per line to a local file
#[derive(Debug)]
pub struct JsonlLogSink {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl JsonlLogSink {
    /// Open (or create) the log file in append mode
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::log_write(format!("Failed to create '{}': {e}", parent.display()))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::log_write(format!("Failed to open '{}': {e}", path.display())))?;

        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSink for JsonlLogSink {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| Error::log_write(format!("{}: {e}", self.path.display())))?;
        file.flush()
            .await
            .map_err(|e| Error::log_write(format!("{}: {e}", self.path.display())))
    }

    async fn flush(&self) -> Result<()> {
        let file = self.file.lock().await;
        file.sync_data()
            .await
            .map_err(|e| Error::log_write(format!("{}: {e}", self.path.display())))
    }

    fn label(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

// ============================================================================
// In-Memory
// ============================================================================

/// Keeps entries in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryLogSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries written so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::log_write("memory sink lock poisoned"))?
            .push(entry.clone());
        Ok(())
    }

    fn label(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// Fan-out
// ============================================================================

/// Writes every entry to several sinks
///
/// A failing sink does not stop the others from being written; the
/// failures are combined into one error.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// Add a sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

fn combine(failures: Vec<String>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::log_write(failures.join("; ")))
    }
}

#[async_trait]
impl LogSink for FanoutSink {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.append(entry).await {
                failures.push(format!("{}: {e}", sink.label()));
            }
        }
        combine(failures)
    }

    async fn flush(&self) -> Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.flush().await {
                failures.push(format!("{}: {e}", sink.label()));
            }
        }
        combine(failures)
    }

    fn label(&self) -> String {
        let names: Vec<String> = self.sinks.iter().map(|s| s.label()).collect();
        format!("fanout[{}]", names.join(", "))
    }
}
