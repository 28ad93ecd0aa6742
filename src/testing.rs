//! Test doubles shared by unit tests

use crate::error::{Error, Result};
use crate::schema::TableSchema;
use crate::source::CsvReader;
use crate::warehouse::{convert_row, LoadOutcome, LoadRequest, Warehouse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory warehouse with scripted failures
#[derive(Debug, Default)]
pub struct ScriptedWarehouse {
    schemas: Mutex<HashMap<String, TableSchema>>,
    executed: Mutex<Vec<String>>,
    loads: Mutex<Vec<LoadRequest>>,
    fail_on: Vec<String>,
    fail_load: Option<String>,
    delay: Option<Duration>,
    cleanup: Vec<String>,
}

impl ScriptedWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any statement containing `pattern`
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    /// Fail every bulk load with `message`
    pub fn failing_load(mut self, message: &str) -> Self {
        self.fail_load = Some(message.to_string());
        self
    }

    /// Sleep before answering any call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_cleanup(mut self, statement: &str) -> Self {
        self.cleanup.push(statement.to_string());
        self
    }

    pub fn with_table(self, table: &str, schema: TableSchema) -> Self {
        self.schemas
            .lock()
            .unwrap()
            .insert(table.to_lowercase(), schema);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<LoadRequest> {
        self.loads.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Warehouse for ScriptedWarehouse {
    async fn execute(&self, statement: &str) -> Result<usize> {
        self.pause().await;
        self.executed.lock().unwrap().push(statement.to_string());
        if self.fail_on.iter().any(|p| statement.contains(p.as_str())) {
            return Err(Error::warehouse("Parser Error: syntax error at or near"));
        }
        Ok(0)
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.schemas.lock().unwrap().contains_key(&table.to_lowercase()))
    }

    async fn get_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        self.pause().await;
        Ok(self.schemas.lock().unwrap().get(&table.to_lowercase()).cloned())
    }

    async fn load(&self, request: &LoadRequest) -> Result<LoadOutcome> {
        self.pause().await;
        self.loads.lock().unwrap().push(request.clone());
        if let Some(message) = &self.fail_load {
            return Err(Error::warehouse(message.clone()));
        }

        let reader = CsvReader::open(&request.source)?;
        let width = reader.headers().len();
        let mut outcome = LoadOutcome::default();
        for row in reader {
            match convert_row(
                &row?,
                width,
                &request.columns,
                &request.source.format.null_markers,
            ) {
                Ok(_) => outcome.rows_loaded += 1,
                Err(rejection) => outcome.rejected.push(rejection),
            }
        }
        Ok(outcome)
    }

    fn cleanup_statements(&self, _request: &LoadRequest) -> Vec<String> {
        self.cleanup.clone()
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
