//! Load runs and the load executor
//!
//! A [`LoadRun`] is one attempt to load one file into one table. The
//! [`LoadExecutor`] applies a reconcile plan to the warehouse and bulk-loads
//! the file, reporting every statement to the audit log.

mod executor;
mod types;

pub use executor::{LoadExecutor, DEFAULT_STATEMENT_TIMEOUT};
pub use types::{LoadRun, RunError};

#[cfg(test)]
mod tests;
