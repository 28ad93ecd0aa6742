//! CLI module
//!
//! Command-line interface for loading flat files.
//!
//! # Commands
//!
//! - `load` - Profile, reconcile and load files into the warehouse
//! - `profile` - Print inferred schemas (dry run)
//! - `validate` - Check the configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, LoadArgs, OutputFormat};
pub use runner::Runner;
