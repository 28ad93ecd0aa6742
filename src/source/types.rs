//! Source file types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes read from the head of a file to sniff the delimiter and estimate rows
const SNIFF_BYTES: usize = 64 * 1024;

/// Character encoding of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8 (invalid sequences are a read error)
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to one character
    Latin1,
}

/// Declared file format options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Delimiter: a single character or a preset (`csv`, `tsv`, `semicolon`, `pipe`).
    /// Sniffed from the file when absent.
    pub delimiter: Option<String>,
    /// Quote character
    pub quote: char,
    /// Character encoding
    pub encoding: Encoding,
    /// Values treated as NULL in addition to empty values
    pub null_markers: Vec<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: '"',
            encoding: Encoding::Utf8,
            null_markers: vec!["NULL".to_string(), "\\N".to_string()],
        }
    }
}

impl FormatOptions {
    /// Resolve the declared delimiter into a single byte
    pub fn declared_delimiter(&self) -> Result<Option<u8>> {
        let Some(raw) = self.delimiter.as_deref() else {
            return Ok(None);
        };

        let byte = match raw.to_ascii_lowercase().as_str() {
            "csv" | "comma" => b',',
            "tsv" | "tab" | "\\t" => b'\t',
            "semicolon" | "csv_semicolon_delimiter" => b';',
            "pipe" => b'|',
            _ => single_byte("delimiter", raw)?,
        };
        Ok(Some(byte))
    }

    /// Quote character as a single byte
    pub fn quote_byte(&self) -> Result<u8> {
        single_byte("quote", &self.quote.to_string())
    }

    /// Resolve the format for a particular file
    pub fn resolve(&self, path: &Path, head: &[u8]) -> Result<CsvFormat> {
        let delimiter = match self.declared_delimiter()? {
            Some(d) => d,
            None => infer_delimiter(path, head),
        };
        Ok(CsvFormat {
            delimiter,
            quote: self.quote_byte()?,
            encoding: self.encoding,
            null_markers: self.null_markers.clone(),
        })
    }
}

fn single_byte(field: &str, raw: &str) -> Result<u8> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(Error::invalid_value(
            field,
            format!("'{raw}' must be a single ASCII character"),
        )),
    }
}

/// Pick a delimiter from the file extension, else from the header line
pub fn infer_delimiter(path: &Path, head: &[u8]) -> u8 {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if matches!(ext.as_deref(), Some("tsv" | "tab")) {
        return b'\t';
    }

    let header_line = head.split(|b| *b == b'\n').next().unwrap_or_default();
    [b',', b';', b'\t', b'|']
        .into_iter()
        .map(|d| (d, header_line.iter().filter(|b| **b == d).count()))
        .filter(|(_, count)| *count > 0)
        // max_by_key keeps the last maximum; reverse priority so ',' wins ties
        .rev()
        .max_by_key(|(_, count)| *count)
        .map_or(b',', |(d, _)| d)
}

/// Fully resolved CSV dialect of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub quote: u8,
    pub encoding: Encoding,
    pub null_markers: Vec<String>,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            encoding: Encoding::Utf8,
            null_markers: FormatOptions::default().null_markers,
        }
    }
}

/// A delimited input file
///
/// Immutable once created; profiling and loading only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Location of the file
    pub path: PathBuf,
    /// Resolved dialect
    pub format: CsvFormat,
    /// File size in bytes
    pub size_bytes: u64,
    /// Estimated number of data rows
    pub estimated_rows: u64,
}

impl SourceFile {
    /// Stat the file, resolve its format and estimate its row count
    pub fn open(path: impl AsRef<Path>, options: &FormatOptions) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let metadata =
            std::fs::metadata(path).map_err(|e| Error::file_read(&display, e.to_string()))?;
        if !metadata.is_file() {
            return Err(Error::file_read(&display, "not a regular file"));
        }

        let mut head = Vec::with_capacity(SNIFF_BYTES);
        std::fs::File::open(path)
            .and_then(|f| f.take(SNIFF_BYTES as u64).read_to_end(&mut head))
            .map_err(|e| Error::file_read(&display, e.to_string()))?;

        let format = options.resolve(path, &head)?;
        let estimated_rows = estimate_rows(metadata.len(), &head);

        Ok(Self {
            path: path.to_path_buf(),
            format,
            size_bytes: metadata.len(),
            estimated_rows,
        })
    }

    /// Build a source file without touching the filesystem
    pub fn with_format(path: impl Into<PathBuf>, format: CsvFormat) -> Self {
        Self {
            path: path.into(),
            format,
            size_bytes: 0,
            estimated_rows: 0,
        }
    }

    /// File name component, for comments and naming
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Path as a display string
    pub fn display(&self) -> String {
        self.path.display().to_string()
    }
}

/// Estimate data rows from the file size and the average line length of its head
fn estimate_rows(size: u64, head: &[u8]) -> u64 {
    if head.is_empty() {
        return 0;
    }
    let mut lines = head.iter().filter(|b| **b == b'\n').count() as u64;
    if head.len() as u64 >= size {
        // The whole file was read; count a final unterminated line
        if head.last() != Some(&b'\n') {
            lines += 1;
        }
        return lines.saturating_sub(1);
    }
    if lines == 0 {
        return 0;
    }
    let avg = head.len() as u64 / lines;
    (size / avg.max(1)).saturating_sub(1)
}
