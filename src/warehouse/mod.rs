//! Warehouse collaborator
//!
//! The narrow contract the pipeline needs from a SQL warehouse, the SQL text
//! it issues, and an embedded DuckDB implementation.
//!
//! # Features
//!
//! - **Standard DDL**: CREATE TABLE, ADD COLUMN, SET DATA TYPE, COMMENT
//! - **Bulk Load**: One transactional load per file with per-row rejections
//! - **Introspection**: Destination schema mapped back onto the closed type set
//! - **Timeouts**: Every call bounded by the caller's statement timeout

mod engine;
mod rows;
pub mod sql;
mod types;

pub use engine::DuckDbWarehouse;
pub use rows::convert_row;
pub use types::{ColumnMapping, LoadOutcome, LoadRequest, RowRejection};

use crate::error::{Error, Result};
use crate::schema::TableSchema;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// SQL warehouse the pipeline loads into
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one statement, returning the affected row count
    async fn execute(&self, statement: &str) -> Result<usize>;

    /// Whether a table exists
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Current schema of a table, `None` if it does not exist
    async fn get_schema(&self, table: &str) -> Result<Option<TableSchema>>;

    /// Bulk-load one file into its destination table
    async fn load(&self, request: &LoadRequest) -> Result<LoadOutcome>;

    /// Statements to run after a successful load
    fn cleanup_statements(&self, _request: &LoadRequest) -> Vec<String> {
        Vec::new()
    }

    /// Human-readable description for diagnostics
    fn describe(&self) -> String;
}

/// Run a warehouse call, failing with [`Error::Timeout`] after `limit`
///
/// The call's future is dropped on timeout; warehouses that hand work to
/// other threads must stop that work when this happens.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(limit)),
    }
}
