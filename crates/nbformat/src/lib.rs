pub mod source;
pub mod v4;
pub mod validate;

use serde::Serialize as _;
use serde_json::Value;
use thiserror::Error;

pub use source::SourceStyle;
pub use validate::SchemaViolation;

#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("Unsupported notebook version: {0}.{1}")]
    UnsupportedVersion(i32, i32),
    #[error("JSON parsing error")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, NotebookError>;

/// Parse a persisted notebook. Any 4.x document is accepted; other majors
/// are rejected before decoding.
pub fn parse_notebook(json: &str) -> Result<v4::Notebook> {
    let value: Value = serde_json::from_str(json)?;
    notebook_from_value(value)
}

pub fn notebook_from_value(value: Value) -> Result<v4::Notebook> {
    let nbformat = value["nbformat"].as_i64().unwrap_or(0) as i32;
    let nbformat_minor = value["nbformat_minor"].as_i64().unwrap_or(0) as i32;

    match nbformat {
        4 => Ok(serde_json::from_value::<v4::Notebook>(value)?),
        _ => Err(NotebookError::UnsupportedVersion(nbformat, nbformat_minor)),
    }
}

/// Serialize with sources written as line fragments.
pub fn serialize_notebook(notebook: &v4::Notebook) -> Result<String> {
    serialize_notebook_with(notebook, SourceStyle::Lines)
}

pub fn serialize_notebook_with(notebook: &v4::Notebook, style: SourceStyle) -> Result<String> {
    if notebook.nbformat != 4 {
        return Err(NotebookError::UnsupportedVersion(
            notebook.nbformat,
            notebook.nbformat_minor,
        ));
    }

    let mut value = serde_json::to_value(notebook)?;
    if style == SourceStyle::Joined {
        join_cell_sources(&mut value);
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    // Append a newline to the buffer to match the python implementation of nbformat
    buf.push(b'\n');

    let notebook_json =
        String::from_utf8(buf).map_err(|e| NotebookError::ValidationError(e.to_string()))?;

    Ok(notebook_json)
}

fn join_cell_sources(value: &mut Value) {
    let Some(cells) = value.get_mut("cells").and_then(Value::as_array_mut) else {
        return;
    };
    for cell in cells {
        if let Some(source) = cell.get_mut("source") {
            if let Some(joined) = source::normalize_value(source) {
                *source = Value::String(joined);
            }
        }
    }
}
