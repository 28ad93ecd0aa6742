//! DuckDB-backed warehouse
//!
//! Two connections to one database, each behind a mutex: one for DDL and
//! loads, one for audit rows so log writes never queue behind a load. Every
//! call runs on the blocking thread pool. Dropping a call's future (as
//! [`bounded`](super::bounded) does on timeout) interrupts the statement in
//! flight and rolls back an unfinished load.

use super::rows::convert_row;
use super::sql;
use super::types::{LoadOutcome, LoadRequest};
use super::Warehouse;
use crate::audit::{LogEntry, LogSink};
use crate::error::{Error, Result};
use crate::schema::{ColumnDef, ColumnType, TableSchema};
use crate::source::CsvReader;
use crate::types::LoadMode;
use async_trait::async_trait;
use duckdb::{Connection, InterruptHandle};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Warehouse implementation over an embedded DuckDB database
pub struct DuckDbWarehouse {
    /// Connection for DDL, introspection and loads
    data: Session,
    /// Connection for audit rows
    audit: Session,
    /// Database path used (for logging)
    path: String,
    /// Audit log table, once created
    audit_table: Option<String>,
}

impl std::fmt::Debug for DuckDbWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbWarehouse")
            .field("path", &self.path)
            .field("audit_table", &self.audit_table)
            .finish_non_exhaustive()
    }
}

impl DuckDbWarehouse {
    /// Open a database file (or `:memory:`) and run session statements
    pub fn open(path: &str, init_statements: &[String]) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| Error::warehouse(format!("Failed to open DuckDB '{path}': {e}")))?;

        for statement in init_statements {
            tracing::debug!(statement = %statement, "Running init statement");
            conn.execute_batch(statement).map_err(|e| {
                Error::warehouse(format!("Init statement failed ({statement}): {e}"))
            })?;
        }

        let audit_conn = conn
            .try_clone()
            .map_err(|e| Error::warehouse(format!("Failed to open audit connection: {e}")))?;

        tracing::info!(path, "Opened DuckDB warehouse");
        Ok(Self {
            data: Session::new(conn),
            audit: Session::new(audit_conn),
            path: path.to_string(),
            audit_table: None,
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:", &[])
    }

    /// Create the audit table if needed and use it as a log sink
    pub async fn with_audit_table(mut self, table: &str) -> Result<Self> {
        let statement = sql::create_audit_table_sql(table);
        self.audit
            .run(move |conn, _| {
                conn.execute_batch(&statement)
                    .map_err(|e| Error::log_write(format!("Failed to create audit table: {e}")))
            })
            .await?;
        self.audit_table = Some(table.to_string());
        Ok(self)
    }

    /// Run a query returning a single string column
    pub async fn query_strings(&self, query: &str) -> Result<Vec<String>> {
        let query = query.to_string();
        self.data
            .run(move |conn, _| {
                let mut stmt = conn
                    .prepare(&query)
                    .map_err(|e| Error::warehouse(format!("Failed to prepare query: {e}")))?;
                let values = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(|e| Error::warehouse(format!("Query failed: {e}")))?
                    .filter_map(std::result::Result::ok)
                    .collect();
                Ok(values)
            })
            .await
    }
}

/// One connection and the handle that interrupts its running statement
struct Session {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

impl Session {
    fn new(conn: Connection) -> Self {
        let interrupt = conn.interrupt_handle();
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        }
    }

    /// Run a closure against the connection on the blocking pool
    ///
    /// If the returned future is dropped before it completes, a closure that
    /// has not started yet never runs, and a running one is interrupted and
    /// sees [`Call::check`] fail.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &Call) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let call = Call::default();
        let mut abandon = AbandonOnDrop {
            call: call.clone(),
            interrupt: Arc::clone(&self.interrupt),
            armed: true,
        };

        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::warehouse("DuckDB connection lock poisoned"))?;
            call.begin()?;
            let result = f(&mut guard, &call);
            call.finish();
            result
        })
        .await;

        abandon.armed = false;
        result?
    }
}

#[derive(Debug, Default)]
struct CallState {
    running: bool,
    abandoned: bool,
}

/// Abandonment flag shared between a call's future and its blocking closure
#[derive(Debug, Clone, Default)]
struct Call {
    state: Arc<Mutex<CallState>>,
}

impl Call {
    fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| Error::Cancelled)?;
        if state.abandoned {
            return Err(Error::Cancelled);
        }
        state.running = true;
        Ok(())
    }

    fn finish(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.running = false;
        }
    }

    /// Fail with [`Error::Cancelled`] once the caller has stopped waiting
    fn check(&self) -> Result<()> {
        match self.state.lock() {
            Ok(state) if !state.abandoned => Ok(()),
            _ => Err(Error::Cancelled),
        }
    }
}

/// Marks a call abandoned, and interrupts it, when its future is dropped early
struct AbandonOnDrop {
    call: Call,
    interrupt: Arc<InterruptHandle>,
    armed: bool,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut state) = self.call.state.lock() else {
            return;
        };
        state.abandoned = true;
        // Only while the closure holds the connection, so no other call is hit
        if state.running {
            tracing::warn!("Interrupting abandoned DuckDB statement");
            self.interrupt.interrupt();
        }
    }
}

/// Split `schema.table` into its parts, defaulting the schema to `main`
fn split_table(table: &str) -> (String, String) {
    match table.split_once('.') {
        Some((schema, name)) => (schema.to_string(), name.to_string()),
        None => ("main".to_string(), table.to_string()),
    }
}

fn read_schema(conn: &Connection, table: &str) -> Result<Option<TableSchema>> {
    let (schema_name, table_name) = split_table(table);
    let mut stmt = conn
        .prepare(
            "SELECT column_name, data_type, is_nullable
             FROM information_schema.columns
             WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?)
             ORDER BY ordinal_position",
        )
        .map_err(|e| Error::schema_conflict(table, format!("Failed to prepare query: {e}")))?;

    let rows: Vec<(String, String, String)> = stmt
        .query_map(duckdb::params![schema_name, table_name], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(|e| Error::schema_conflict(table, format!("Failed to read columns: {e}")))?
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::schema_conflict(table, format!("Failed to read columns: {e}")))?;

    if rows.is_empty() {
        return Ok(None);
    }

    let columns = rows
        .into_iter()
        .map(|(name, data_type, nullable)| {
            let column_type =
                ColumnType::from_sql(&data_type).ok_or_else(|| Error::UnsupportedType {
                    table: table.to_string(),
                    column: name.clone(),
                    data_type: data_type.clone(),
                })?;
            Ok(ColumnDef::new(
                name,
                column_type,
                nullable.eq_ignore_ascii_case("YES"),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    TableSchema::from_columns(columns).map(Some)
}

fn bulk_load(conn: &mut Connection, call: &Call, request: &LoadRequest) -> Result<LoadOutcome> {
    let table = request.table.as_str();
    let load_err = |e: duckdb::Error| Error::load(table, e.to_string());

    let mut reader = CsvReader::open(&request.source)?;
    let width = reader.headers().len();
    let markers = request.source.format.null_markers.clone();
    let stage = format!("__flatload_stage_{}", Uuid::new_v4().simple());

    let tx = conn.transaction().map_err(load_err)?;

    if request.mode == LoadMode::Replace {
        let statement = sql::delete_all_sql(table);
        tracing::debug!(statement = %statement, "Clearing destination");
        tx.execute_batch(&statement).map_err(load_err)?;
    }

    tx.execute_batch(&sql::create_stage_sql(&stage, &request.columns))
        .map_err(load_err)?;

    let mut rejected = Vec::new();
    {
        let mut insert = tx
            .prepare(&sql::insert_stage_row_sql(&stage, request.columns.len()))
            .map_err(load_err)?;

        while let Some(row) = reader
            .next_row()
            .map_err(|e| Error::load(table, e.to_string()))?
        {
            call.check()?;
            match convert_row(&row, width, &request.columns, &markers) {
                Ok(values) => {
                    insert
                        .execute(duckdb::params_from_iter(values.iter()))
                        .map_err(load_err)?;
                }
                Err(rejection) => {
                    tracing::debug!(table, line = rejection.line, reason = %rejection.reason, "Rejected row");
                    rejected.push(rejection);
                }
            }
        }
    }

    let statement = sql::insert_from_stage_sql(table, &stage, &request.columns);
    tracing::debug!(statement = %statement, "Copying stage into destination");
    let inserted = tx.execute(&statement, []).map_err(load_err)?;

    tx.execute_batch(&sql::drop_table_sql(&stage))
        .map_err(load_err)?;
    // Dropping the transaction on an early return rolls the load back
    call.check()?;
    tx.commit().map_err(load_err)?;

    Ok(LoadOutcome {
        rows_loaded: inserted as u64,
        rejected,
    })
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn execute(&self, statement: &str) -> Result<usize> {
        let statement = statement.to_string();
        self.data
            .run(move |conn, _| {
                tracing::debug!(statement = %statement, "Executing statement");
                conn.execute(&statement, [])
                    .map_err(|e| Error::warehouse(e.to_string()))
            })
            .await
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let (schema_name, table_name) = split_table(table);
        self.data
            .run(move |conn, _| {
                let count: i64 = conn
                    .query_row(
                        "SELECT count(*) FROM information_schema.tables
                         WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
                        duckdb::params![schema_name, table_name],
                        |row| row.get(0),
                    )
                    .map_err(|e| Error::warehouse(format!("Failed to check table: {e}")))?;
                Ok(count > 0)
            })
            .await
    }

    async fn get_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        let table = table.to_string();
        self.data.run(move |conn, _| read_schema(conn, &table)).await
    }

    async fn load(&self, request: &LoadRequest) -> Result<LoadOutcome> {
        let request = request.clone();
        self.data
            .run(move |conn, call| bulk_load(conn, call, &request))
            .await
    }

    fn cleanup_statements(&self, _request: &LoadRequest) -> Vec<String> {
        vec!["CHECKPOINT".to_string()]
    }

    fn describe(&self) -> String {
        format!("duckdb:{}", self.path)
    }
}

#[async_trait]
impl LogSink for DuckDbWarehouse {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let Some(table) = self.audit_table.clone() else {
            return Err(Error::log_write("no audit table configured"));
        };
        let entry = entry.clone();
        self.audit
            .run(move |conn, _| {
                conn.execute(
                    &sql::insert_audit_sql(&table),
                    duckdb::params![
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
                        entry.load_run_id,
                        entry.severity.to_string(),
                        entry.message,
                    ],
                )
                .map_err(|e| Error::log_write(e.to_string()))?;
                Ok(())
            })
            .await
    }

    fn label(&self) -> String {
        format!(
            "duckdb:{}:{}",
            self.path,
            self.audit_table.as_deref().unwrap_or("<none>")
        )
    }
}
