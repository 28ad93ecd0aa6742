//! Destination naming templates
//!
//! Handles `{{ variable }}` interpolation in the destination table template.
//! Supports nested access like `{{ file.stem }}` and `{{ vars.schema }}`.

use crate::error::{Error, Result};
use crate::schema::sanitize_identifier;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Source file values: `name`, `stem`, `ext`, `dir`
    pub file: Value,
    /// User-defined variables from the configuration
    pub vars: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context describing a source file
    pub fn for_file(path: &Path) -> Self {
        let lossy = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
        };
        let dir = path
            .parent()
            .and_then(Path::file_name)
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            file: json!({
                "name": lossy(path.file_name()),
                "stem": lossy(path.file_stem()),
                "ext": lossy(path.extension()),
                "dir": dir,
            }),
            vars: Value::Null,
        }
    }

    /// Set user variables
    #[must_use]
    pub fn with_vars(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.vars = json!(vars);
        self
    }

    /// Get a value by path (e.g., "file.stem")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();
        let (root, rest) = parts.split_first()?;

        let root = match *root {
            "file" => &self.file,
            "vars" => &self.vars,
            // Bare names resolve against vars
            _ => return get_nested_value(&self.vars, &parts),
        };
        get_nested_value(root, rest)
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut errors = Vec::new();

    let result = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        match ctx.get(var_path) {
            Some(value) => value_to_string(value),
            None => {
                errors.push(var_path.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Render the destination table name for a source file
///
/// The rendered text is sanitized like a column header; an empty result is a
/// template error.
pub fn render_table_name(
    template: &str,
    path: &Path,
    vars: &BTreeMap<String, String>,
) -> Result<String> {
    let ctx = TemplateContext::for_file(path).with_vars(vars);
    let rendered = render(template, &ctx)?;

    if !rendered.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::template(format!(
            "Template '{template}' renders an empty table name for '{}'",
            path.display()
        )));
    }
    Ok(sanitize_identifier(&rendered, 0))
}

/// Check that a template only references known roots
pub fn validate_template(template: &str, vars: &BTreeMap<String, String>) -> Result<()> {
    if template.trim().is_empty() {
        return Err(Error::template("Table template is empty"));
    }
    for variable in extract_variables(template) {
        let known = match variable.split_once('.') {
            Some(("file", field)) => matches!(field, "name" | "stem" | "ext" | "dir"),
            Some(("vars", name)) => vars.contains_key(name),
            Some(_) => false,
            None => vars.contains_key(&variable),
        };
        if !known {
            return Err(Error::undefined_var(variable));
        }
    }
    Ok(())
}
