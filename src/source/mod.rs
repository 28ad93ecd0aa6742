//! Source files
//!
//! Locates delimited input files, resolves their dialect and streams their
//! rows.
//!
//! # Features
//!
//! - **Discovery**: Expands paths and file-name globs in input order
//! - **Dialect Resolution**: Declared delimiter presets or header sniffing
//! - **Encodings**: UTF-8 and Latin-1
//! - **Row Estimate**: Extrapolated from the head of the file

mod discover;
mod reader;
mod types;

pub use discover::{expand_inputs, is_glob};
pub use reader::{CsvReader, SourceRow};
pub use types::{infer_delimiter, CsvFormat, Encoding, FormatOptions, SourceFile};
