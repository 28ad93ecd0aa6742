//! Batch coordination
//!
//! Drives many source files through profile, reconcile and load against one
//! shared warehouse and audit log.
//!
//! # Features
//!
//! - **Failure Isolation**: A failed file is recorded and the batch moves on
//! - **Table Groups**: Files for the same table never run concurrently
//! - **Cancellation**: Stops dispatch; finished runs are left as they are
//! - **Summary**: Written to the audit log under the batch id

mod coordinator;
mod types;

pub use coordinator::BatchCoordinator;
pub use types::{BatchResult, ExitStatus};
