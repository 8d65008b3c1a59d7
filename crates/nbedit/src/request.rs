//! Named operations as a host hands them over, and the dispatcher that runs
//! them against a notebook.
//!
//! Arguments arrive as plain JSON-compatible values (signed indices included),
//! so range checks that the typed operations cannot express happen here.

use nbformat::source::line_count;
use nbformat::v4::{CellMetadata, CellType, Metadata, Notebook, Output};
use nbformat::SchemaViolation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::EditContext;
use crate::error::{EditError, Result};
use crate::info::info;
use crate::ops::{self, NewCell};
use crate::query;

fn default_count() -> i64 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Request {
    Insert {
        index: i64,
        #[serde(rename = "type", alias = "cell_type")]
        cell_type: CellType,
        #[serde(default)]
        source: String,
    },
    BulkInsert {
        index: i64,
        cells: Vec<NewCell>,
    },
    ReplaceSource {
        index: i64,
        source: String,
    },
    Delete {
        index: i64,
    },
    Retype {
        index: i64,
        #[serde(alias = "newType")]
        new_type: CellType,
    },
    Duplicate {
        index: i64,
        #[serde(default = "default_count")]
        count: i64,
    },
    Move {
        from: i64,
        to: i64,
    },
    Split {
        index: i64,
        #[serde(alias = "lineNumber")]
        line_number: i64,
    },
    Merge {
        index: i64,
    },
    EditMetadata {
        index: i64,
        metadata: CellMetadata,
    },
    EditOutputs {
        index: i64,
        outputs: Vec<Output>,
    },
    ClearOutputs {
        index: i64,
    },
    ClearAllOutputs,
    EditDocumentMetadata {
        metadata: Metadata,
    },
    ReadCell {
        index: i64,
    },
    ReadCellMetadata {
        index: i64,
    },
    ReadCellOutput {
        index: i64,
    },
    Count,
    Outline,
    Search {
        query: String,
        #[serde(default, alias = "caseSensitive")]
        case_sensitive: bool,
    },
    Validate,
    Info,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Insert { .. } => "insert",
            Request::BulkInsert { .. } => "bulk_insert",
            Request::ReplaceSource { .. } => "replace_source",
            Request::Delete { .. } => "delete",
            Request::Retype { .. } => "retype",
            Request::Duplicate { .. } => "duplicate",
            Request::Move { .. } => "move",
            Request::Split { .. } => "split",
            Request::Merge { .. } => "merge",
            Request::EditMetadata { .. } => "edit_metadata",
            Request::EditOutputs { .. } => "edit_outputs",
            Request::ClearOutputs { .. } => "clear_outputs",
            Request::ClearAllOutputs => "clear_all_outputs",
            Request::EditDocumentMetadata { .. } => "edit_document_metadata",
            Request::ReadCell { .. } => "read_cell",
            Request::ReadCellMetadata { .. } => "read_cell_metadata",
            Request::ReadCellOutput { .. } => "read_cell_output",
            Request::Count => "count",
            Request::Outline => "outline",
            Request::Search { .. } => "search",
            Request::Validate => "validate",
            Request::Info => "info",
        }
    }
}

/// What an operation produced.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Response {
    /// Human-readable summary or the queried text.
    pub text: String,
    /// The same result in structured form.
    pub data: Value,
    /// Whether the notebook changed and should be persisted.
    pub modified: bool,
}

impl Response {
    fn changed(text: impl Into<String>, data: Value) -> Self {
        Self {
            text: text.into(),
            data,
            modified: true,
        }
    }

    fn read(text: impl Into<String>, data: Value) -> Self {
        Self {
            text: text.into(),
            data,
            modified: false,
        }
    }

    /// Report a validation outcome. A violation is a result, not an error.
    pub fn validation(outcome: std::result::Result<(), SchemaViolation>) -> Self {
        match outcome {
            Ok(()) => Self::read("Notebook is valid", json!({ "valid": true })),
            Err(violation) => Self::read(
                format!("Notebook is invalid: {}", violation),
                json!({ "valid": false, "reason": violation.to_string() }),
            ),
        }
    }

    /// Whether this is a failed validation result.
    pub fn is_invalid(&self) -> bool {
        self.data.get("valid") == Some(&Value::Bool(false))
    }
}

fn cell_index(notebook: &Notebook, raw: i64) -> Result<usize> {
    usize::try_from(raw)
        .ok()
        .filter(|index| *index < notebook.cells.len())
        .ok_or(EditError::IndexOutOfBounds {
            index: raw,
            len: notebook.cells.len(),
        })
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

impl EditContext {
    /// Run `request` against `notebook`. On error the notebook is unchanged.
    pub fn apply(&self, notebook: &mut Notebook, request: Request) -> Result<Response> {
        let name = request.name();
        let span = tracing::debug_span!("apply", operation = name);
        let _guard = span.enter();

        let result = dispatch(notebook, request);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "operation refused");
        }
        result
    }
}

fn dispatch(notebook: &mut Notebook, request: Request) -> Result<Response> {
    match request {
        Request::Insert {
            index,
            cell_type,
            source,
        } => {
            let position = ops::insert_cell(notebook, index, cell_type, source);
            Ok(Response::changed(
                format!("Inserted {} cell at index {}", cell_type, position),
                json!({ "index": position }),
            ))
        }
        Request::BulkInsert { index, cells } => {
            let inserted = ops::insert_cells(notebook, index, cells);
            let indices: Vec<usize> = inserted.clone().collect();
            let text = if inserted.is_empty() {
                "Inserted 0 cells".to_string()
            } else {
                format!(
                    "Inserted {} cells at indices {}-{}",
                    inserted.len(),
                    inserted.start,
                    inserted.end - 1
                )
            };
            Ok(Response {
                text,
                data: json!({ "indices": indices }),
                modified: !inserted.is_empty(),
            })
        }
        Request::ReplaceSource { index, source } => {
            let index = cell_index(notebook, index)?;
            ops::replace_source(notebook, index, source)?;
            Ok(Response::changed(
                format!("Replaced source of cell {}", index),
                json!({ "index": index }),
            ))
        }
        Request::Delete { index } => {
            let index = cell_index(notebook, index)?;
            let removed = ops::delete_cell(notebook, index)?;
            Ok(Response::changed(
                format!("Deleted {} cell at index {}", removed.cell_type(), index),
                json!({ "index": index, "remaining": notebook.cells.len() }),
            ))
        }
        Request::Retype { index, new_type } => {
            let index = cell_index(notebook, index)?;
            let previous = ops::change_cell_type(notebook, index, new_type)?;
            Ok(Response::changed(
                format!("Changed cell {} from {} to {}", index, previous, new_type),
                json!({ "index": index, "from": previous, "to": new_type }),
            ))
        }
        Request::Duplicate { index, count } => {
            let index = cell_index(notebook, index)?;
            let count = usize::try_from(count)
                .ok()
                .filter(|count| *count > 0)
                .ok_or(EditError::InvalidCount(count))?;
            let copies = ops::duplicate_cell(notebook, index, count)?;
            let indices: Vec<usize> = copies.collect();
            Ok(Response::changed(
                format!(
                    "Duplicated cell {} {} time{}",
                    index,
                    count,
                    if count == 1 { "" } else { "s" }
                ),
                json!({ "indices": indices }),
            ))
        }
        Request::Move { from, to } => {
            let from = cell_index(notebook, from)?;
            let to = cell_index(notebook, to)?;
            ops::move_cell(notebook, from, to)?;
            Ok(Response::changed(
                format!("Moved cell {} to index {}", from, to),
                json!({ "from": from, "to": to }),
            ))
        }
        Request::Split { index, line_number } => {
            let index = cell_index(notebook, index)?;
            let line = usize::try_from(line_number).map_err(|_| EditError::LineOutOfBounds {
                index,
                line: line_number,
                line_count: line_count(notebook.cells[index].source()),
            })?;
            let new_index = ops::split_cell(notebook, index, line)?;
            Ok(Response::changed(
                format!(
                    "Split cell {} at line {}; new cell at index {}",
                    index, line, new_index
                ),
                json!({ "index": index, "new_index": new_index }),
            ))
        }
        Request::Merge { index } => {
            let index = cell_index(notebook, index)?;
            ops::merge_cells(notebook, index)?;
            Ok(Response::changed(
                format!("Merged cell {} into cell {}", index + 1, index),
                json!({ "index": index }),
            ))
        }
        Request::EditMetadata { index, metadata } => {
            let index = cell_index(notebook, index)?;
            ops::edit_cell_metadata(notebook, index, metadata)?;
            let merged = notebook.cells[index].metadata().clone();
            Ok(Response::changed(
                format!("Updated metadata of cell {}", index),
                Value::Object(merged),
            ))
        }
        Request::EditOutputs { index, outputs } => {
            let index = cell_index(notebook, index)?;
            let count = outputs.len();
            ops::set_outputs(notebook, index, outputs)?;
            Ok(Response::changed(
                format!("Replaced outputs of cell {} ({} outputs)", index, count),
                json!({ "index": index, "outputs": count }),
            ))
        }
        Request::ClearOutputs { index } => {
            let index = cell_index(notebook, index)?;
            let was_code = ops::clear_outputs(notebook, index)?;
            let text = if was_code {
                format!("Cleared outputs of cell {}", index)
            } else {
                format!(
                    "Cell {} is a {} cell; nothing to clear",
                    index,
                    notebook.cells[index].cell_type()
                )
            };
            Ok(Response {
                text,
                data: json!({ "index": index, "cleared": was_code }),
                modified: was_code,
            })
        }
        Request::ClearAllOutputs => {
            let cleared = ops::clear_all_outputs(notebook);
            Ok(Response::changed(
                format!("Cleared outputs of {} code cells", cleared),
                json!({ "cleared": cleared }),
            ))
        }
        Request::EditDocumentMetadata { metadata } => {
            ops::edit_notebook_metadata(notebook, metadata);
            Ok(Response::changed(
                "Updated notebook metadata",
                Value::Object(notebook.metadata.clone()),
            ))
        }
        Request::ReadCell { index } => {
            let index = cell_index(notebook, index)?;
            let source = query::read_cell(notebook, index)?;
            Ok(Response::read(
                source,
                json!({
                    "index": index,
                    "cell_type": notebook.cells[index].cell_type(),
                    "source": source,
                }),
            ))
        }
        Request::ReadCellMetadata { index } => {
            let index = cell_index(notebook, index)?;
            let metadata = query::read_cell_metadata(notebook, index)?;
            Ok(Response::read(pretty(metadata), Value::Object(metadata.clone())))
        }
        Request::ReadCellOutput { index } => {
            let index = cell_index(notebook, index)?;
            let outputs = query::read_cell_outputs(notebook, index)?;
            Ok(Response::read(pretty(&outputs), Value::Array(outputs.to_vec())))
        }
        Request::Count => {
            let count = query::cell_count(notebook);
            Ok(Response::read(
                format!("Notebook has {} cells", count),
                json!(count),
            ))
        }
        Request::Outline => {
            let entries = query::outline(notebook);
            let text = if entries.is_empty() {
                "Notebook is empty".to_string()
            } else {
                entries
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            Ok(Response::read(text, json!(entries)))
        }
        Request::Search {
            query: needle,
            case_sensitive,
        } => {
            let hits = query::search(notebook, &needle, case_sensitive);
            let mut text = format!("Found {} matching cells for {:?}", hits.len(), needle);
            for hit in &hits {
                text.push_str(&format!("\n[{}] {}", hit.index, hit.cell_type));
                for m in &hit.matches {
                    text.push_str(&format!("\n  line {}: {}", m.line, m.text));
                }
            }
            Ok(Response::read(text, json!(hits)))
        }
        Request::Validate => Ok(Response::validation(notebook.validate())),
        Request::Info => {
            let info = info(notebook);
            Ok(Response::read(info.to_string(), json!(info)))
        }
    }
}
