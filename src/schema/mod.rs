//! Type profiling and schema reconciliation
//!
//! Infers a closed-set column type for every field of a delimited file and
//! decides how the inferred schema fits an existing destination table.
//!
//! # Features
//!
//! - **Type Profiling**: BOOLEAN, INTEGER, DECIMAL, DATE, TIMESTAMP, STRING
//! - **Monotonic Widening**: A field's type only ever widens while sampling
//! - **Leading Zeros**: "007" stays STRING
//! - **Header Sanitation**: Unique, warehouse-friendly column names
//! - **Reconciliation**: CREATE, COMPATIBLE, WIDEN or REJECT

mod inference;
mod names;
mod reconcile;
mod types;
pub mod value;

pub use inference::{TypeProfiler, DEFAULT_SAMPLE_ROWS};
pub use names::{sanitize_identifier, unique_column_names};
pub use reconcile::{reconcile, Alteration, Conflict, ReconcileAction, ReconcilePlan};
pub use types::{
    ColumnDef, ColumnType, FieldProfile, ProfileReport, TableSchema, Widening, DECIMAL_PRECISION,
};

#[cfg(test)]
mod tests;
