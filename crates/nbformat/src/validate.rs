//! Structural conformance checks against the required shape of an nbformat v4
//! document.
//!
//! This works on raw JSON so it can report problems that would otherwise only
//! surface as an opaque decode error. It checks structure only: output records
//! and metadata contents are not inspected.

use serde_json::Value;
use thiserror::Error;

use crate::source::normalize_value;
use crate::v4::{duplicate_ids, Cell, CellType};

/// Top-level keys every persisted notebook must carry.
pub const REQUIRED_KEYS: [&str; 4] = ["cells", "metadata", "nbformat", "nbformat_minor"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("Notebook is not a JSON object")]
    NotAnObject,
    #[error("Missing required field: {0}")]
    MissingKey(&'static str),
    #[error("Field 'cells' must be an array")]
    CellsNotArray,
    #[error("Field 'metadata' must be an object")]
    MetadataNotObject,
    #[error("Field '{0}' must be an integer")]
    VersionNotInteger(&'static str),
    #[error("Unsupported nbformat major version {0} (expected 4)")]
    UnsupportedMajor(i64),
    #[error("Cell {0} is not a JSON object")]
    CellNotObject(usize),
    #[error("Cell {0} is missing 'cell_type'")]
    MissingCellType(usize),
    #[error("Cell {index} has invalid cell_type {cell_type}")]
    UnknownCellType { index: usize, cell_type: String },
    #[error("Cell {0} is missing 'source'")]
    MissingSource(usize),
    #[error("Cell {0} has a 'source' that is neither a string nor an array of strings")]
    InvalidSource(usize),
    #[error("Cell {0} has a 'metadata' field that is not an object")]
    CellMetadataNotObject(usize),
    #[error("Duplicate cell id: {0}")]
    DuplicateCellId(String),
    #[error("Notebook could not be encoded: {0}")]
    Unserializable(String),
}

/// Check `value` against the required notebook shape, reporting the first
/// violation found.
pub fn validate(value: &Value) -> Result<(), SchemaViolation> {
    let root = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

    for key in REQUIRED_KEYS {
        if !root.contains_key(key) {
            return Err(SchemaViolation::MissingKey(key));
        }
    }

    let cells = root["cells"]
        .as_array()
        .ok_or(SchemaViolation::CellsNotArray)?;

    if !root["metadata"].is_object() {
        return Err(SchemaViolation::MetadataNotObject);
    }

    let major = root["nbformat"]
        .as_i64()
        .ok_or(SchemaViolation::VersionNotInteger("nbformat"))?;
    if root["nbformat_minor"].as_i64().is_none() {
        return Err(SchemaViolation::VersionNotInteger("nbformat_minor"));
    }
    if major != 4 {
        return Err(SchemaViolation::UnsupportedMajor(major));
    }

    for (index, cell) in cells.iter().enumerate() {
        validate_cell(index, cell)?;
    }

    // Only worth decoding once the shape is known to be sound.
    if let Ok(decoded) = serde_json::from_value::<Vec<Cell>>(root["cells"].clone()) {
        if let Some(id) = duplicate_ids(&decoded).first() {
            return Err(SchemaViolation::DuplicateCellId(id.to_string()));
        }
    }

    Ok(())
}

fn validate_cell(index: usize, cell: &Value) -> Result<(), SchemaViolation> {
    let cell = cell
        .as_object()
        .ok_or(SchemaViolation::CellNotObject(index))?;

    let cell_type = cell
        .get("cell_type")
        .ok_or(SchemaViolation::MissingCellType(index))?;
    let recognized = cell_type
        .as_str()
        .and_then(|s| s.parse::<CellType>().ok())
        .is_some();
    if !recognized {
        return Err(SchemaViolation::UnknownCellType {
            index,
            cell_type: cell_type.to_string(),
        });
    }

    let source = cell
        .get("source")
        .ok_or(SchemaViolation::MissingSource(index))?;
    if normalize_value(source).is_none() {
        return Err(SchemaViolation::InvalidSource(index));
    }

    if let Some(metadata) = cell.get("metadata") {
        if !metadata.is_object() {
            return Err(SchemaViolation::CellMetadataNotObject(index));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "cells": [
                { "cell_type": "markdown", "metadata": {}, "source": "# Hi" },
                {
                    "cell_type": "code",
                    "execution_count": null,
                    "metadata": {},
                    "outputs": [],
                    "source": ["x = 1\n", "x"]
                }
            ],
            "metadata": {},
            "nbformat": 4,
            "nbformat_minor": 4
        })
    }

    #[test]
    fn test_minimal_notebook_is_valid() {
        assert_eq!(validate(&minimal()), Ok(()));
    }

    #[test]
    fn test_each_missing_top_level_key_is_reported() {
        for key in REQUIRED_KEYS {
            let mut value = minimal();
            value.as_object_mut().unwrap().remove(key);
            assert_eq!(validate(&value), Err(SchemaViolation::MissingKey(key)));
        }
    }

    #[test]
    fn test_cells_must_be_an_array() {
        let mut value = minimal();
        value["cells"] = json!({ "0": {} });
        assert_eq!(validate(&value), Err(SchemaViolation::CellsNotArray));
    }

    #[test]
    fn test_cell_type_checks() {
        let mut value = minimal();
        value["cells"][0].as_object_mut().unwrap().remove("cell_type");
        assert_eq!(validate(&value), Err(SchemaViolation::MissingCellType(0)));

        let mut value = minimal();
        value["cells"][1]["cell_type"] = json!("heading");
        let err = validate(&value).unwrap_err();
        assert!(matches!(err, SchemaViolation::UnknownCellType { index: 1, .. }));
        assert!(err.to_string().contains("heading"));
    }

    #[test]
    fn test_source_checks() {
        let mut value = minimal();
        value["cells"][1].as_object_mut().unwrap().remove("source");
        assert_eq!(validate(&value), Err(SchemaViolation::MissingSource(1)));

        let mut value = minimal();
        value["cells"][0]["source"] = json!(12);
        assert_eq!(validate(&value), Err(SchemaViolation::InvalidSource(0)));
    }

    #[test]
    fn test_major_version_must_be_four() {
        let mut value = minimal();
        value["nbformat"] = json!(3);
        assert_eq!(validate(&value), Err(SchemaViolation::UnsupportedMajor(3)));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut value = minimal();
        value["nbformat_minor"] = json!(5);
        value["cells"][0]["id"] = json!("dup");
        value["cells"][1]["id"] = json!("dup");
        assert_eq!(
            validate(&value),
            Err(SchemaViolation::DuplicateCellId("dup".into()))
        );
    }

    #[test]
    fn test_outputs_are_not_inspected() {
        let mut value = minimal();
        value["cells"][1]["outputs"] = json!([{ "anything": "goes" }]);
        assert_eq!(validate(&value), Ok(()));
    }
}
